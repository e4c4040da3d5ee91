use std::sync::Arc;

use crate::error::AppError;
use crate::models::AuthorizationData;
use crate::repositories::AccountRepo;
use crate::services::authorization::AuthorizationClient;
use crate::services::password::PasswordHasher;
use crate::services::totp::TotpService;

/// 認可サービスへ渡すロール。本サービスが扱うのは従業員アカウントのみ
const ROLE_EMPLOYEE: &str = "employee";

/// アカウントサービス
///
/// 資格情報・パスワード・二要素認証のビジネスルールを担う中核。
/// 呼び出しごとにステートレスで、リトライは行わない。
/// ビジネスチェックは必ず、それが守る永続化呼び出しの前に行う
#[derive(Clone)]
pub struct AccountService {
    account_repo: Arc<dyn AccountRepo>,
    authorization_client: Arc<dyn AuthorizationClient>,
    password_hasher: PasswordHasher,
    totp_service: TotpService,
}

impl AccountService {
    /// 新しい AccountService を作成
    pub fn new(
        account_repo: Arc<dyn AccountRepo>,
        authorization_client: Arc<dyn AuthorizationClient>,
        password_hasher: PasswordHasher,
        totp_service: TotpService,
    ) -> Self {
        Self {
            account_repo,
            authorization_client,
            password_hasher,
            totp_service,
        }
    }

    /// アカウント登録
    ///
    /// ログイン重複時は `LoginAlreadyExists`。作成後に認可サービスから
    /// トークンペアを取得する（新規アカウントなので 2FA は常に無効）
    pub async fn register(&self, login: &str, password: &str) -> Result<AuthorizationData, AppError> {
        let hashed_password = self.password_hasher.hash(password)?;
        let account_id = self
            .account_repo
            .create_account(login, &hashed_password)
            .await?;

        let tokens = self
            .authorization_client
            .authorization(account_id, false, ROLE_EMPLOYEE)
            .await?;

        tracing::info!(account_id = %account_id, "アカウント登録成功");

        Ok(AuthorizationData {
            account_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// アカウント登録（Telegram チャネル経由）
    ///
    /// register と同一ルールで、認可サービスの別エンドポイントを呼ぶ
    pub async fn register_from_tg(
        &self,
        login: &str,
        password: &str,
    ) -> Result<AuthorizationData, AppError> {
        let hashed_password = self.password_hasher.hash(password)?;
        let account_id = self
            .account_repo
            .create_account(login, &hashed_password)
            .await?;

        let tokens = self
            .authorization_client
            .authorization_tg(account_id, false, ROLE_EMPLOYEE)
            .await?;

        tracing::info!(account_id = %account_id, "アカウント登録成功 (tg)");

        Ok(AuthorizationData {
            account_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// ログイン認証
    ///
    /// パスワード検証後、2FA の有効状態（シークレットの有無から導出）を
    /// 認可サービスへ転送する。TOTP コードの検証はここでは行わず、
    /// 2FA チャレンジの強制は認可サービス側の責務
    pub async fn login(&self, login: &str, password: &str) -> Result<AuthorizationData, AppError> {
        let account = self
            .account_repo
            .account_by_login(login)
            .await?
            .ok_or_else(|| {
                tracing::info!("アカウントが見つかりません");
                AppError::AccountNotFound
            })?;

        if !self.password_hasher.verify(&account.password, password)? {
            tracing::info!(account_id = %account.id, "ログイン失敗: パスワード不一致");
            return Err(AppError::InvalidPassword);
        }

        let tokens = self
            .authorization_client
            .authorization(account.id, account.two_fa_enabled(), ROLE_EMPLOYEE)
            .await?;

        tracing::info!(account_id = %account.id, "ログイン成功");

        Ok(AuthorizationData {
            account_id: account.id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// 2FAシークレットとQRコードを生成
    ///
    /// 純粋な生成処理。ここでは何も永続化しない。
    /// シークレットは set_two_fa_key で検証コードと共に戻されて初めて保存される
    pub fn generate_two_fa_key(&self, account_id: i64) -> Result<(String, Vec<u8>), AppError> {
        let two_fa_key = TotpService::generate_secret();
        let qr_png = self
            .totp_service
            .qr_code_png(&format!("account_id-{}", account_id), &two_fa_key)?;

        Ok((two_fa_key, qr_png))
    }

    /// 2FAを有効化
    ///
    /// 有効→有効 の遷移はエラー（冪等な再有効化は許可しない）
    pub async fn set_two_fa_key(
        &self,
        account_id: i64,
        two_fa_key: &str,
        two_fa_code: &str,
    ) -> Result<(), AppError> {
        let account = self
            .account_repo
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if account.two_fa_enabled() {
            tracing::info!(account_id = %account_id, "2FAは既に有効");
            return Err(AppError::TwoFaAlreadyEnabled);
        }

        // 提出されたシークレットに対してコードを検証してから保存する
        if !self.totp_service.verify_code(two_fa_key, two_fa_code)? {
            tracing::info!(account_id = %account_id, "無効な2FAコード");
            return Err(AppError::TwoFaCodeInvalid);
        }

        self.account_repo
            .set_two_fa_key(account_id, two_fa_key)
            .await?;

        tracing::info!(account_id = %account_id, "2FA有効化完了");
        Ok(())
    }

    /// 2FAを無効化
    ///
    /// 無効→無効 の遷移はエラー。コードは保存済みシークレットに対して検証する
    pub async fn delete_two_fa_key(
        &self,
        account_id: i64,
        two_fa_code: &str,
    ) -> Result<(), AppError> {
        let account = self
            .account_repo
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if !account.two_fa_enabled() {
            tracing::info!(account_id = %account_id, "2FAが有効化されていません");
            return Err(AppError::TwoFaNotEnabled);
        }

        if !self
            .totp_service
            .verify_code(&account.two_fa_key, two_fa_code)?
        {
            tracing::info!(account_id = %account_id, "無効な2FAコード");
            return Err(AppError::TwoFaCodeInvalid);
        }

        self.account_repo.delete_two_fa_key(account_id).await?;

        tracing::info!(account_id = %account_id, "2FA無効化完了");
        Ok(())
    }

    /// 2FAコードを検証
    ///
    /// 2FA無効のアカウントに対する照会はエラー。
    /// コードの一致・不一致はエラーではなく bool で返す
    pub async fn verify_two_fa(
        &self,
        account_id: i64,
        two_fa_code: &str,
    ) -> Result<bool, AppError> {
        let account = self
            .account_repo
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if !account.two_fa_enabled() {
            tracing::info!(account_id = %account_id, "2FAが有効化されていません");
            return Err(AppError::TwoFaNotEnabled);
        }

        self.totp_service
            .verify_code(&account.two_fa_key, two_fa_code)
    }

    /// パスワード復旧
    ///
    /// 旧資格情報を確認せず無条件で上書きする。
    /// 本人確認済み（認可レイヤー通過済み）の「パスワードを忘れた」フロー用
    pub async fn recovery_password(
        &self,
        account_id: i64,
        new_password: &str,
    ) -> Result<(), AppError> {
        let new_hashed_password = self.password_hasher.hash(new_password)?;
        self.account_repo
            .update_password(account_id, &new_hashed_password)
            .await?;

        tracing::info!(account_id = %account_id, "パスワード復旧完了");
        Ok(())
    }

    /// パスワード変更
    ///
    /// 旧パスワードの検証に成功した場合のみ新パスワードを保存する
    pub async fn change_password(
        &self,
        account_id: i64,
        new_password: &str,
        old_password: &str,
    ) -> Result<(), AppError> {
        let account = self
            .account_repo
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if !self.password_hasher.verify(&account.password, old_password)? {
            tracing::info!(account_id = %account_id, "パスワード変更失敗: 旧パスワード不一致");
            return Err(AppError::InvalidPassword);
        }

        let new_hashed_password = self.password_hasher.hash(new_password)?;
        self.account_repo
            .update_password(account_id, &new_hashed_password)
            .await?;

        tracing::info!(account_id = %account_id, "パスワード変更完了");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use data_encoding::BASE32;
    use secrecy::SecretBox;
    use time::OffsetDateTime;
    use totp_rs::{Algorithm, TOTP};

    use super::*;
    use crate::models::{Account, CheckAuthorizationData, JwtTokens};

    /// インメモリのアカウントリポジトリ（テスト用ダブル）
    #[derive(Default)]
    struct InMemoryAccountRepo {
        accounts: Mutex<Vec<Account>>,
    }

    #[async_trait]
    impl AccountRepo for InMemoryAccountRepo {
        async fn create_account(
            &self,
            login: &str,
            hashed_password: &str,
        ) -> Result<i64, AppError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|a| a.login == login) {
                return Err(AppError::LoginAlreadyExists);
            }
            let id = accounts.len() as i64 + 1;
            accounts.push(Account {
                id,
                login: login.to_string(),
                password: hashed_password.to_string(),
                two_fa_key: String::new(),
                created_at: OffsetDateTime::now_utc(),
            });
            Ok(id)
        }

        async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>, AppError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts.iter().find(|a| a.id == account_id).cloned())
        }

        async fn account_by_login(&self, login: &str) -> Result<Option<Account>, AppError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts.iter().find(|a| a.login == login).cloned())
        }

        async fn set_two_fa_key(
            &self,
            account_id: i64,
            two_fa_key: &str,
        ) -> Result<(), AppError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(account) = accounts.iter_mut().find(|a| a.id == account_id) {
                account.two_fa_key = two_fa_key.to_string();
            }
            Ok(())
        }

        async fn delete_two_fa_key(&self, account_id: i64) -> Result<(), AppError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(account) = accounts.iter_mut().find(|a| a.id == account_id) {
                account.two_fa_key = String::new();
            }
            Ok(())
        }

        async fn update_password(
            &self,
            account_id: i64,
            hashed_password: &str,
        ) -> Result<(), AppError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(account) = accounts.iter_mut().find(|a| a.id == account_id) {
                account.password = hashed_password.to_string();
            }
            Ok(())
        }
    }

    /// 呼び出し内容を記録する認可クライアント（テスト用ダブル）
    #[derive(Default)]
    struct RecordingAuthorizationClient {
        /// (account_id, two_fa_status, role, tgチャネルか)
        calls: Mutex<Vec<(i64, bool, String, bool)>>,
    }

    impl RecordingAuthorizationClient {
        fn record(&self, account_id: i64, two_fa_status: bool, role: &str, tg: bool) -> JwtTokens {
            self.calls
                .lock()
                .unwrap()
                .push((account_id, two_fa_status, role.to_string(), tg));
            JwtTokens {
                access_token: format!("access-{}", account_id),
                refresh_token: format!("refresh-{}", account_id),
            }
        }
    }

    #[async_trait]
    impl AuthorizationClient for RecordingAuthorizationClient {
        async fn authorization(
            &self,
            account_id: i64,
            two_fa_status: bool,
            role: &str,
        ) -> Result<JwtTokens, AppError> {
            Ok(self.record(account_id, two_fa_status, role, false))
        }

        async fn authorization_tg(
            &self,
            account_id: i64,
            two_fa_status: bool,
            role: &str,
        ) -> Result<JwtTokens, AppError> {
            Ok(self.record(account_id, two_fa_status, role, true))
        }

        async fn check_authorization(
            &self,
            _access_token: &str,
        ) -> Result<CheckAuthorizationData, AppError> {
            unimplemented!("not used by the account service")
        }
    }

    fn create_test_service() -> (AccountService, Arc<RecordingAuthorizationClient>) {
        let repo = Arc::new(InMemoryAccountRepo::default());
        let client = Arc::new(RecordingAuthorizationClient::default());
        let service = AccountService::new(
            repo,
            client.clone(),
            PasswordHasher::new(SecretBox::new(Box::new("test-pepper".to_string()))),
            TotpService::new("TestApp".to_string()),
        );
        (service, client)
    }

    /// 現在時刻で有効なコードを生成（テスト用）
    fn current_code(secret: &str) -> String {
        let secret_bytes = BASE32.decode(secret.as_bytes()).unwrap();
        let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret_bytes, None, String::new()).unwrap();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        totp.generate(now)
    }

    #[tokio::test]
    async fn test_register() {
        let (service, client) = create_test_service();

        let result = service.register("alice", "secret123").await.unwrap();
        assert!(result.account_id > 0);
        assert_eq!(result.access_token, format!("access-{}", result.account_id));

        // 認可サービスは 2FA無効・employee ロールで1回だけ呼ばれる
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (result.account_id, false, "employee".to_string(), false)
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_login() {
        let (service, _) = create_test_service();

        service.register("alice", "secret123").await.unwrap();
        let result = service.register("alice", "x").await;
        assert!(matches!(result, Err(AppError::LoginAlreadyExists)));
    }

    #[tokio::test]
    async fn test_register_from_tg_uses_alternate_channel() {
        let (service, client) = create_test_service();

        let result = service.register_from_tg("alice", "secret123").await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            (result.account_id, false, "employee".to_string(), true)
        );
    }

    #[tokio::test]
    async fn test_login_success() {
        let (service, client) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let logged_in = service.login("alice", "secret123").await.unwrap();
        assert_eq!(logged_in.account_id, registered.account_id);

        // 2FA未設定のログインは two_fa_status=false で認可される
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].1);
    }

    #[tokio::test]
    async fn test_login_unknown_account() {
        let (service, _) = create_test_service();

        let result = service.login("nobody", "secret123").await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (service, _) = create_test_service();

        service.register("alice", "secret123").await.unwrap();
        let result = service.login("alice", "wrong-password").await;
        assert!(matches!(result, Err(AppError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_login_forwards_two_fa_status() {
        let (service, client) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let account_id = registered.account_id;

        let (key, _) = service.generate_two_fa_key(account_id).unwrap();
        service
            .set_two_fa_key(account_id, &key, &current_code(&key))
            .await
            .unwrap();

        service.login("alice", "secret123").await.unwrap();

        // 2FA有効化後のログインは two_fa_status=true で認可される
        let calls = client.calls.lock().unwrap();
        assert!(calls.last().unwrap().1);
    }

    #[tokio::test]
    async fn test_generate_two_fa_key_does_not_persist() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let (key, qr_png) = service.generate_two_fa_key(registered.account_id).unwrap();

        assert_eq!(key.len(), 32);
        assert_eq!(&qr_png[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);

        // set が呼ばれるまでアカウントは 2FA 無効のまま
        let result = service
            .verify_two_fa(registered.account_id, "000000")
            .await;
        assert!(matches!(result, Err(AppError::TwoFaNotEnabled)));
    }

    #[tokio::test]
    async fn test_set_two_fa_key_rejects_invalid_code() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let (key, _) = service.generate_two_fa_key(registered.account_id).unwrap();

        let result = service
            .set_two_fa_key(registered.account_id, &key, "000000")
            .await;
        // 000000 が偶然正解になる確率は無視できる
        assert!(matches!(result, Err(AppError::TwoFaCodeInvalid)));

        // 失敗時は何も永続化されない
        let result = service
            .verify_two_fa(registered.account_id, "000000")
            .await;
        assert!(matches!(result, Err(AppError::TwoFaNotEnabled)));
    }

    #[tokio::test]
    async fn test_two_fa_lifecycle() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let account_id = registered.account_id;

        let (key, _) = service.generate_two_fa_key(account_id).unwrap();
        service
            .set_two_fa_key(account_id, &key, &current_code(&key))
            .await
            .unwrap();

        // 有効化後: 正しいコードは true、誤ったコードは false（エラーではない）
        assert!(
            service
                .verify_two_fa(account_id, &current_code(&key))
                .await
                .unwrap()
        );
        let wrong = if current_code(&key) == "000000" { "000001" } else { "000000" };
        assert!(!service.verify_two_fa(account_id, wrong).await.unwrap());

        // 無効化
        service
            .delete_two_fa_key(account_id, &current_code(&key))
            .await
            .unwrap();

        // 無効化後の照会はエラー
        let result = service.verify_two_fa(account_id, "000000").await;
        assert!(matches!(result, Err(AppError::TwoFaNotEnabled)));
    }

    #[tokio::test]
    async fn test_set_two_fa_key_twice_is_error() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let account_id = registered.account_id;

        let (key, _) = service.generate_two_fa_key(account_id).unwrap();
        service
            .set_two_fa_key(account_id, &key, &current_code(&key))
            .await
            .unwrap();

        // 有効→有効 の遷移は冪等な no-op ではなくエラー
        let (second_key, _) = service.generate_two_fa_key(account_id).unwrap();
        let result = service
            .set_two_fa_key(account_id, &second_key, &current_code(&second_key))
            .await;
        assert!(matches!(result, Err(AppError::TwoFaAlreadyEnabled)));
    }

    #[tokio::test]
    async fn test_delete_two_fa_key_twice_is_error() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let account_id = registered.account_id;

        let (key, _) = service.generate_two_fa_key(account_id).unwrap();
        service
            .set_two_fa_key(account_id, &key, &current_code(&key))
            .await
            .unwrap();
        service
            .delete_two_fa_key(account_id, &current_code(&key))
            .await
            .unwrap();

        let result = service
            .delete_two_fa_key(account_id, &current_code(&key))
            .await;
        assert!(matches!(result, Err(AppError::TwoFaNotEnabled)));
    }

    #[tokio::test]
    async fn test_delete_two_fa_key_rejects_invalid_code() {
        let (service, _) = create_test_service();

        let registered = service.register("alice", "secret123").await.unwrap();
        let account_id = registered.account_id;

        let (key, _) = service.generate_two_fa_key(account_id).unwrap();
        service
            .set_two_fa_key(account_id, &key, &current_code(&key))
            .await
            .unwrap();

        let wrong = if current_code(&key) == "000000" { "000001" } else { "000000" };
        let result = service.delete_two_fa_key(account_id, wrong).await;
        assert!(matches!(result, Err(AppError::TwoFaCodeInvalid)));

        // 失敗時は 2FA は有効なまま
        assert!(
            service
                .verify_two_fa(account_id, &current_code(&key))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_two_fa_on_missing_account() {
        let (service, _) = create_test_service();

        let result = service.set_two_fa_key(999, "SECRET", "000000").await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));

        let result = service.delete_two_fa_key(999, "000000").await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));

        let result = service.verify_two_fa(999, "000000").await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_change_password_round_trip() {
        let (service, _) = create_test_service();

        let registered = service.register("bob", "old-password").await.unwrap();
        service
            .change_password(registered.account_id, "new-password", "old-password")
            .await
            .unwrap();

        // 新パスワードでログインできる
        service.login("bob", "new-password").await.unwrap();

        // 旧パスワードは拒否される
        let result = service.login("bob", "old-password").await;
        assert!(matches!(result, Err(AppError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_old_password() {
        let (service, _) = create_test_service();

        let registered = service.register("bob", "old-password").await.unwrap();
        let result = service
            .change_password(registered.account_id, "new-password", "wrong-password")
            .await;
        assert!(matches!(result, Err(AppError::InvalidPassword)));

        // 失敗時はパスワードは変更されない
        service.login("bob", "old-password").await.unwrap();
    }

    #[tokio::test]
    async fn test_recovery_password_is_unconditional() {
        let (service, _) = create_test_service();

        let registered = service.register("bob", "old-password").await.unwrap();

        // 旧資格情報なしで上書きされる
        service
            .recovery_password(registered.account_id, "recovered-password")
            .await
            .unwrap();

        service.login("bob", "recovered-password").await.unwrap();
        let result = service.login("bob", "old-password").await;
        assert!(matches!(result, Err(AppError::InvalidPassword)));
    }
}
