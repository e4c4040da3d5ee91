use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    /// 認可サービスのベースURL（例: http://authorization:8001）
    pub authorization_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // 2FA (TOTP) 設定
    /// TOTP発行者名（認証アプリに表示される）
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,

    // パスワードハッシュ設定
    /// サーバー全体のペッパー（ハッシュ前に平文へ前置する秘密鍵）
    pub password_secret_key: SecretBox<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TOTP_ISSUER: &str = "idgate";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_totp_issuer() -> String {
    DEFAULT_TOTP_ISSUER.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
