use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::Account;

/// アカウント永続化の抽象インターフェース
///
/// 本番実装は [`PgAccountRepo`]。テストではインメモリ実装に差し替える
#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// 新しいアカウントを作成し、採番された ID を返す
    ///
    /// login の UNIQUE 制約違反は `AppError::LoginAlreadyExists` になる
    async fn create_account(&self, login: &str, hashed_password: &str) -> Result<i64, AppError>;

    /// アカウントIDでアカウントを検索
    async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>, AppError>;

    /// ログインでアカウントを検索
    async fn account_by_login(&self, login: &str) -> Result<Option<Account>, AppError>;

    /// 2FAシークレットを設定（無条件上書き）
    async fn set_two_fa_key(&self, account_id: i64, two_fa_key: &str) -> Result<(), AppError>;

    /// 2FAシークレットをクリア（空文字列に戻す）
    async fn delete_two_fa_key(&self, account_id: i64) -> Result<(), AppError>;

    /// パスワードハッシュを更新（無条件上書き）
    ///
    /// # Note
    /// hashed_password はログに出力しないこと
    async fn update_password(&self, account_id: i64, hashed_password: &str)
    -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgAccountRepo {
    pool: PgPool,
}

impl PgAccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepo for PgAccountRepo {
    async fn create_account(&self, login: &str, hashed_password: &str) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO accounts (login, password)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(login)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // UNIQUE制約違反チェック
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("accounts_login_key")
            {
                return AppError::LoginAlreadyExists;
            }
            AppError::Database(e)
        })?;

        Ok(row.0)
    }

    async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, login, password, two_fa_key, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account_by_login(&self, login: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, login, password, two_fa_key, created_at
            FROM accounts
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn set_two_fa_key(&self, account_id: i64, two_fa_key: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET two_fa_key = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(two_fa_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_two_fa_key(&self, account_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET two_fa_key = ''
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        account_id: i64,
        hashed_password: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET password = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(hashed_password)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
