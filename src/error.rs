use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("アカウントが見つかりません")]
    AccountNotFound,

    #[error("このログインは既に使用されています")]
    LoginAlreadyExists,

    #[error("パスワードが正しくありません")]
    InvalidPassword,

    #[error("二要素認証は既に有効です")]
    TwoFaAlreadyEnabled,

    #[error("二要素認証が有効化されていません")]
    TwoFaNotEnabled,

    #[error("認証コードが無効です")]
    TwoFaCodeInvalid,

    #[error("権限がありません")]
    PermissionDenied,

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("認可サービス API エラー")]
    Authorization(#[from] reqwest::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::AccountNotFound => (
                StatusCode::NOT_FOUND,
                "アカウントが見つかりません".to_string(),
            ),
            Self::LoginAlreadyExists => (
                StatusCode::CONFLICT,
                "このログインは既に使用されています".to_string(),
            ),
            Self::InvalidPassword => (
                StatusCode::UNAUTHORIZED,
                "ログインまたはパスワードが正しくありません".to_string(),
            ),
            Self::TwoFaAlreadyEnabled => {
                (StatusCode::CONFLICT, "二要素認証は既に有効です".to_string())
            }
            Self::TwoFaNotEnabled => (
                StatusCode::BAD_REQUEST,
                "二要素認証が有効化されていません".to_string(),
            ),
            Self::TwoFaCodeInvalid => (
                StatusCode::UNAUTHORIZED,
                "認証コードが正しくありません".to_string(),
            ),
            Self::PermissionDenied => {
                (StatusCode::FORBIDDEN, "権限がありません".to_string())
            }
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Authorization(e) => {
                tracing::error!(error = ?e, "認可サービス通信エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "認可サービスとの通信に失敗しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
