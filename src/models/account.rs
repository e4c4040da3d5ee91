use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// アカウント
///
/// `two_fa_key` は Base32 の TOTP シークレット。空文字列 = 2FA 無効。
/// 2FA の有効状態はこのフィールドの有無のみから導出する（別フラグは持たない）
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: i64,
    pub login: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub two_fa_key: String,
    pub created_at: OffsetDateTime,
}

impl Account {
    /// 2FA が有効かどうか（シークレットの有無から導出）
    pub fn two_fa_enabled(&self) -> bool {
        !self.two_fa_key.is_empty()
    }
}
