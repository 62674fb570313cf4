//! AuthService - account / session 操作のファサード
//!
//! session の状態はバックエンド側にあり、ここでは何も保持しません。

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::errors::BackendError;
use crate::domain::user::{Credentials, NewAccount, Session, User};
use crate::ports::{AccountApi, IdGenerator};

pub struct AuthService {
    account: Arc<dyn AccountApi>,
    ids: Arc<dyn IdGenerator>,
}

impl AuthService {
    pub fn new(account: Arc<dyn AccountApi>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { account, ids }
    }

    /// account を作成して、そのまま同じ資格情報でログインする
    pub async fn create_account(&self, new_account: &NewAccount) -> Result<Session, BackendError> {
        let user_id = self.ids.generate_user_id();
        let creds = &new_account.credentials;
        if let Err(e) = self
            .account
            .create_account(&user_id, &creds.email, &creds.password, &new_account.name)
            .await
        {
            error!(email = %creds.email, error = %e, "create_account failed");
            return Err(e);
        }
        info!(user_id = %user_id, "account created");
        self.login(creds).await
    }

    pub async fn login(&self, creds: &Credentials) -> Result<Session, BackendError> {
        match self
            .account
            .create_email_password_session(&creds.email, &creds.password)
            .await
        {
            Ok(session) => {
                info!(user_id = %session.user_id, "logged in");
                Ok(session)
            }
            Err(e) => {
                error!(email = %creds.email, error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// 未ログインも含めて失敗はすべて `None`
    pub async fn current_user(&self) -> Option<User> {
        match self.account.get_account().await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "current_user unavailable");
                None
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.account.delete_sessions().await {
            error!(error = %e, "logout failed");
        }
    }
}
