pub mod health;
pub mod login;
pub mod password;
pub mod register;
pub mod two_factor;

pub use health::health_check;
pub use login::login;
pub use password::{change_password, recovery_password};
pub use register::{register, register_from_tg};
pub use two_factor::{delete_two_fa, generate_two_fa, set_two_fa, verify_two_fa};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppError;
use crate::models::AuthorizationData;
use crate::state::AppState;

const ACCESS_TOKEN_COOKIE: &str = "Access-Token";
const REFRESH_TOKEN_COOKIE: &str = "Refresh-Token";

/// Access-Token クッキーを検証し、呼び出し元のアカウントIDを返す
///
/// クッキーなし、または認可サービスが account_id = 0 を返した場合は 403
pub(crate) async fn authenticated_account_id(
    state: &AppState,
    jar: &CookieJar,
) -> Result<i64, AppError> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .ok_or(AppError::PermissionDenied)?;

    let authorization_data = state
        .authorization_client
        .check_authorization(token.value())
        .await?;

    if authorization_data.account_id == 0 {
        return Err(AppError::PermissionDenied);
    }

    Ok(authorization_data.account_id)
}

/// トークンペアをクッキーに設定
///
/// # Security
/// HttpOnly + Secure + SameSite=Lax
pub(crate) fn set_auth_cookies(jar: CookieJar, authorization_data: &AuthorizationData) -> CookieJar {
    let access = Cookie::build((ACCESS_TOKEN_COOKIE, authorization_data.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    let refresh = Cookie::build((REFRESH_TOKEN_COOKIE, authorization_data.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();

    jar.add(access).add(refresh)
}
