use data_encoding::BASE32;
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;

/// TOTP (Time-based One-Time Password) サービス
///
/// # Security
/// - シークレット平文はログに出力しない
/// - コード検証は前後1ステップ（±30秒）を許容。同一ウィンドウ内の
///   コード再利用は防がない（リプレイ対策はスコープ外）
#[derive(Clone)]
pub struct TotpService {
    issuer: String,
}

impl TotpService {
    /// 新しい TotpService を作成
    ///
    /// # Arguments
    /// * `issuer` - TOTP発行者名（アプリ名）
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// QRコードを生成（PNG形式のバイト列）
    ///
    /// otpauth://totp/... のプロビジョニングURIをQRコード化する。
    /// 状態は一切持たない純粋な描画処理
    ///
    /// # Arguments
    /// * `account_label` - アカウント識別ラベル（例: account_id-42）
    /// * `secret` - Base32エンコードされたシークレット
    pub fn qr_code_png(&self, account_label: &str, secret: &str) -> Result<Vec<u8>, AppError> {
        let totp = self.create_totp(account_label, secret)?;

        let png = totp.get_qr_png().map_err(|e| {
            tracing::error!(error = %e, "QRコード生成エラー");
            AppError::Internal(anyhow::anyhow!("qr code generation error"))
        })?;

        Ok(png)
    }

    /// TOTPコードを検証
    ///
    /// # Note
    /// 前後1ステップの時間ウィンドウを許容（±30秒）
    pub fn verify_code(&self, secret: &str, code: &str) -> Result<bool, AppError> {
        // 入力検証: コードは6桁の数字のみ
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let totp = self.create_totp_for_verify(secret)?;

        let current_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| {
                tracing::error!(error = ?e, "システム時刻取得エラー");
                AppError::Internal(anyhow::anyhow!("system time error"))
            })?
            .as_secs();

        // check は内部で skew を考慮して検証
        Ok(totp.check(code, current_time))
    }

    /// TOTP オブジェクトを作成（QRコード生成用）
    fn create_totp(&self, account_label: &str, secret: &str) -> Result<TOTP, AppError> {
        let secret_bytes = BASE32.decode(secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "シークレットのBase32デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
        })?;

        TOTP::new(
            Algorithm::SHA1,
            6,  // 6桁
            1,  // skew: 前後1ステップ許容
            30, // period: 30秒
            secret_bytes,
            Some(self.issuer.clone()),
            account_label.to_string(),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "TOTP作成エラー");
            AppError::Internal(anyhow::anyhow!("totp creation error"))
        })
    }

    /// TOTP オブジェクトを作成（検証用）
    fn create_totp_for_verify(&self, secret: &str) -> Result<TOTP, AppError> {
        let secret_bytes = BASE32.decode(secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "シークレットのBase32デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
        })?;

        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes,
            None,
            String::new(),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "TOTP作成エラー");
            AppError::Internal(anyhow::anyhow!("totp creation error"))
        })
    }
}
