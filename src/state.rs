use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::PgAccountRepo;
use crate::services::{
    AccountService, AuthorizationClient, HttpAuthorizationClient, PasswordHasher, TotpService,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）
#[derive(Clone)]
pub struct AppState {
    /// アカウントサービス（ビジネスロジックの中核）
    pub account_service: AccountService,
    /// 認可サービスクライアント（トークン検証用）
    pub authorization_client: Arc<dyn AuthorizationClient>,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let authorization_client: Arc<dyn AuthorizationClient> = Arc::new(
            HttpAuthorizationClient::new(config.authorization_url.clone()),
        );
        let account_repo = Arc::new(PgAccountRepo::new(db_pool));
        let password_hasher = PasswordHasher::new(config.password_secret_key);
        let totp_service = TotpService::new(config.totp_issuer);

        let account_service = AccountService::new(
            account_repo,
            authorization_client.clone(),
            password_hasher,
            totp_service,
        );

        Self {
            account_service,
            authorization_client,
        }
    }
}
