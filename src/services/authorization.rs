use async_trait::async_trait;
use reqwest::header;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{CheckAuthorizationData, JwtTokens};

/// 認可リクエストボディ（idgate → 認可サービス）
#[derive(Debug, Serialize)]
struct AuthorizationRequest<'a> {
    account_id: i64,
    two_fa_status: bool,
    role: &'a str,
}

/// 認可サービスの抽象インターフェース
///
/// JWT の発行・検証は外部の認可サービスが担う。
/// 本番実装は [`HttpAuthorizationClient`]。テストでは記録用ダブルに差し替える
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// トークンペアを発行（通常チャネル）
    async fn authorization(
        &self,
        account_id: i64,
        two_fa_status: bool,
        role: &str,
    ) -> Result<JwtTokens, AppError>;

    /// トークンペアを発行（Telegram チャネル、別エンドポイント）
    async fn authorization_tg(
        &self,
        account_id: i64,
        two_fa_status: bool,
        role: &str,
    ) -> Result<JwtTokens, AppError>;

    /// アクセストークンを検証し、認可情報を返す
    async fn check_authorization(
        &self,
        access_token: &str,
    ) -> Result<CheckAuthorizationData, AppError>;
}

/// 認可サービス API クライアント
#[derive(Clone)]
pub struct HttpAuthorizationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthorizationClient {
    /// 新しい HttpAuthorizationClient を作成
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post_authorization(
        &self,
        path: &str,
        account_id: i64,
        two_fa_status: bool,
        role: &str,
    ) -> Result<JwtTokens, AppError> {
        let url = format!("{}/api/authorization{}", self.base_url, path);

        let body = AuthorizationRequest {
            account_id,
            two_fa_status,
            role,
        };

        let response: reqwest::Response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "認可サービス authorization 失敗");
            return Err(AppError::Internal(anyhow::anyhow!(
                "authorization service returned status: {}",
                status
            )));
        }

        let tokens: JwtTokens = response.json().await.map_err(|e| {
            tracing::error!(error = ?e, "認可サービスレスポンスのパースエラー");
            AppError::Internal(anyhow::anyhow!("failed to parse authorization response"))
        })?;

        tracing::debug!(account_id = %account_id, "トークンペア発行成功");
        Ok(tokens)
    }
}

#[async_trait]
impl AuthorizationClient for HttpAuthorizationClient {
    async fn authorization(
        &self,
        account_id: i64,
        two_fa_status: bool,
        role: &str,
    ) -> Result<JwtTokens, AppError> {
        self.post_authorization("", account_id, two_fa_status, role)
            .await
    }

    async fn authorization_tg(
        &self,
        account_id: i64,
        two_fa_status: bool,
        role: &str,
    ) -> Result<JwtTokens, AppError> {
        self.post_authorization("/tg", account_id, two_fa_status, role)
            .await
    }

    async fn check_authorization(
        &self,
        access_token: &str,
    ) -> Result<CheckAuthorizationData, AppError> {
        let url = format!("{}/api/authorization/check", self.base_url);

        // 認可サービスはアクセストークンを Cookie で受け取る
        let response: reqwest::Response = self
            .client
            .get(&url)
            .header(header::COOKIE, format!("Access-Token={}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "認可サービス check 失敗");
            return Err(AppError::Internal(anyhow::anyhow!(
                "authorization service returned status: {}",
                status
            )));
        }

        let data: CheckAuthorizationData = response.json().await.map_err(|e| {
            tracing::error!(error = ?e, "認可サービスレスポンスのパースエラー");
            AppError::Internal(anyhow::anyhow!("failed to parse authorization response"))
        })?;

        tracing::debug!(account_id = %data.account_id, "トークン検証成功");
        Ok(data)
    }
}
