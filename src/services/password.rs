use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};
use secrecy::{ExposeSecret, SecretBox};

use crate::error::AppError;

/// パスワードハッシュサービス
///
/// # Security
/// - ハッシュ前にサーバー全体のペッパーを平文へ前置する
///   （DB 単体が漏洩してもペッパーなしではオフライン総当たりできない）
/// - ソルトは毎回ランダム生成。同じ入力でもハッシュ文字列は毎回異なるため、
///   比較は必ず verify() で行うこと（文字列等価比較は不可）
#[derive(Clone)]
pub struct PasswordHasher {
    secret_key: Arc<SecretBox<String>>,
}

impl PasswordHasher {
    /// 新しい PasswordHasher を作成
    ///
    /// # Arguments
    /// * `secret_key` - サーバー全体のペッパー（設定から注入）
    pub fn new(secret_key: SecretBox<String>) -> Self {
        Self {
            secret_key: Arc::new(secret_key),
        }
    }

    /// パスワードをペッパー付きでargon2idハッシュ化
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let peppered = self.pepper(password);

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
                AppError::Internal(anyhow::anyhow!("password hash error"))
            })?;

        Ok(hash.to_string())
    }

    /// パスワードを保存済みハッシュと照合
    ///
    /// 不一致は Ok(false)。保存ハッシュの形式不正のみエラー（データ破損の兆候）
    pub fn verify(&self, stored_hash: &str, password: &str) -> Result<bool, AppError> {
        let peppered = self.pepper(password);

        let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            AppError::Internal(anyhow::anyhow!("password hash parse error"))
        })?;

        Ok(Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn pepper(&self, password: &str) -> String {
        format!("{}{}", self.secret_key.expose_secret(), password)
    }
}
