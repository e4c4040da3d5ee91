use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::authenticated_account_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecoveryPasswordRequest {
    pub new_password: String,
}

/// パスワード復旧ハンドラー
///
/// POST /api/account/password/recovery
///
/// 旧パスワードの確認なしで上書きする。本人確認は
/// 認可レイヤー（Access-Token 検証）で済んでいる前提
pub async fn recovery_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RecoveryPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    // バリデーション
    validate_password(&request.new_password)?;

    state
        .account_service
        .recovery_password(account_id, &request.new_password)
        .await?;

    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
    pub old_password: String,
}

/// パスワード変更ハンドラー
///
/// POST /api/account/password/change
pub async fn change_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    validate_password(&request.new_password)?;

    state
        .account_service
        .change_password(account_id, &request.new_password, &request.old_password)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// パスワードバリデーション
fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}
