use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::set_auth_cookies;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: i64,
}

/// アカウント登録ハンドラー
///
/// POST /api/account/register
///
/// # Security
/// - パスワードはログに出力しない
/// - トークンペアはボディではなくクッキーで返す
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<RegisterResponse>), AppError> {
    // バリデーション
    validate_register_request(&request)?;

    let authorization_data = state
        .account_service
        .register(&request.login, &request.password)
        .await?;

    let jar = set_auth_cookies(jar, &authorization_data);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(RegisterResponse {
            account_id: authorization_data.account_id,
        }),
    ))
}

/// アカウント登録ハンドラー（Telegram チャネル経由）
///
/// POST /api/account/register/tg
pub async fn register_from_tg(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<RegisterResponse>), AppError> {
    validate_register_request(&request)?;

    let authorization_data = state
        .account_service
        .register_from_tg(&request.login, &request.password)
        .await?;

    let jar = set_auth_cookies(jar, &authorization_data);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(RegisterResponse {
            account_id: authorization_data.account_id,
        }),
    ))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    if request.login.trim().is_empty() {
        return Err(AppError::Validation("ログインは必須です".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}
