use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::set_auth_cookies;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account_id: i64,
}

/// ログインハンドラー
///
/// POST /api/account/login
///
/// TOTP コードはここでは受け取らない。2FA の有効状態は
/// 認可サービスへ転送され、チャレンジの強制はそちらの責務
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    // バリデーション
    validate_login_request(&request)?;

    let authorization_data = state
        .account_service
        .login(&request.login, &request.password)
        .await?;

    let jar = set_auth_cookies(jar, &authorization_data);

    Ok((
        jar,
        Json(LoginResponse {
            account_id: authorization_data.account_id,
        }),
    ))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    if request.login.trim().is_empty() {
        return Err(AppError::Validation("ログインは必須です".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_login() {
        let request = LoginRequest {
            login: "".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            login: "alice".to_string(),
            password: "".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            login: "alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_ok());
    }
}
