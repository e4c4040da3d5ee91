use serde::Deserialize;

/// 認可サービスが発行するトークンペア
#[derive(Debug, Clone, Deserialize)]
pub struct JwtTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// register / login の結果 DTO
///
/// トークンはクッキー設定用で、レスポンスボディには含めない
#[derive(Debug)]
pub struct AuthorizationData {
    pub account_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// 認可サービスのトークン検証結果
#[derive(Debug, Deserialize)]
pub struct CheckAuthorizationData {
    pub account_id: i64,
    pub two_fa_status: bool,
    pub role: String,
    pub message: String,
    pub status_code: u16,
}
