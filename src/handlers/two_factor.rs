use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::authenticated_account_id;
use crate::state::AppState;

// === 2FA Generate ===

/// GET /api/account/2fa/generate
///
/// 2FAシークレットとQRコード（PNG）を生成して返す。
/// この時点では何も永続化されない。シークレットは
/// X-TwoFA-Key ヘッダーで返し、set で検証コードと共に戻してもらう
///
/// # Security
/// - シークレット平文はログ出力禁止
pub async fn generate_two_fa(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<([(&'static str, String); 2], Vec<u8>), AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    let (two_fa_key, qr_png) = state.account_service.generate_two_fa_key(account_id)?;

    tracing::info!(account_id = %account_id, "2FA設定開始");

    Ok((
        [
            ("content-type", "image/png".to_string()),
            ("x-twofa-key", two_fa_key),
        ],
        qr_png,
    ))
}

// === 2FA Set ===

#[derive(Debug, Deserialize)]
pub struct SetTwoFaRequest {
    pub two_fa_key: String,
    pub two_fa_code: String,
}

/// POST /api/account/2fa/set
///
/// 2FAを有効化（generate で受け取ったシークレット + 初回コード検証）
pub async fn set_two_fa(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SetTwoFaRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    // バリデーション
    validate_totp_code(&request.two_fa_code)?;

    state
        .account_service
        .set_two_fa_key(account_id, &request.two_fa_key, &request.two_fa_code)
        .await?;

    Ok(Json(serde_json::json!({})))
}

// === 2FA Delete ===

#[derive(Debug, Deserialize)]
pub struct DeleteTwoFaRequest {
    pub two_fa_code: String,
}

/// POST /api/account/2fa/delete
///
/// 2FAを無効化（保存済みシークレットに対するコード検証必須）
pub async fn delete_two_fa(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<DeleteTwoFaRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    validate_totp_code(&request.two_fa_code)?;

    state
        .account_service
        .delete_two_fa_key(account_id, &request.two_fa_code)
        .await?;

    Ok(Json(serde_json::json!({})))
}

// === 2FA Verify ===

#[derive(Debug, Deserialize)]
pub struct VerifyTwoFaRequest {
    pub two_fa_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTwoFaResponse {
    pub is_valid: bool,
}

/// POST /api/account/2fa/verify
///
/// 2FAコードを検証。一致・不一致は is_valid で返す（エラーではない）
pub async fn verify_two_fa(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<VerifyTwoFaRequest>,
) -> Result<Json<VerifyTwoFaResponse>, AppError> {
    let account_id = authenticated_account_id(&state, &jar).await?;

    validate_totp_code(&request.two_fa_code)?;

    let is_valid = state
        .account_service
        .verify_two_fa(account_id, &request.two_fa_code)
        .await?;

    Ok(Json(VerifyTwoFaResponse { is_valid }))
}

// === Helper Functions ===

/// TOTPコードバリデーション
fn validate_totp_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() {
        return Err(AppError::Validation("認証コードは必須です".to_string()));
    }
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "認証コードは6桁の数字で入力してください".to_string(),
        ));
    }
    Ok(())
}
