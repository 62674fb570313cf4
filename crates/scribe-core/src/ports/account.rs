//! AccountApi port - session / account 操作
//!
//! session の発行・破棄はすべて外部プラットフォームが行います。
//! 実装側は「現在の session」を内部に保持します。

use async_trait::async_trait;

use crate::domain::errors::BackendError;
use crate::domain::ids::UserId;
use crate::domain::user::{Session, User};

/// AccountApi は認証まわりの capability
///
/// # 設計原則
/// - 失敗はそのまま `BackendError` で返す（握りつぶすのは app 層）
/// - session がない状態の `get_account` は `ErrorKind::Unauthorized`
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_account(
        &self,
        user_id: &UserId,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError>;

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    async fn get_account(&self) -> Result<User, BackendError>;

    async fn delete_sessions(&self) -> Result<(), BackendError>;
}
