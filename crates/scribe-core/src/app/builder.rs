//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use tracing::info;

use crate::app::auth_service::AuthService;
use crate::app::post_service::PostService;
use crate::app::store::{AppState, AuthAction};
use crate::config::BackendConfig;
use crate::domain::user::User;
use crate::ports::{AccountApi, Backend, DocumentsApi, IdGenerator, StorageApi, SystemClock, UlidGenerator};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .backend(Arc::new(HttpBackend::new(&config)?))
///     .config(config)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に backend と config が揃っているかチェック
/// - 不足があればまとめて BuildError を返す
pub struct AppBuilder {
    account: Option<Arc<dyn AccountApi>>,
    documents: Option<Arc<dyn DocumentsApi>>,
    storage: Option<Arc<dyn StorageApi>>,
    config: Option<BackendConfig>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be provided before build().")]
    MissingComponents(Vec<&'static str>),
}

impl AppBuilder {
    /// 新しい AppBuilder を作成
    pub fn new() -> Self {
        Self {
            account: None,
            documents: None,
            storage: None,
            config: None,
            ids: None,
        }
    }

    /// 3 つの capability をすべて持つ backend を設定
    pub fn backend<B: Backend + 'static>(mut self, backend: Arc<B>) -> Self {
        self.account = Some(backend.clone());
        self.documents = Some(backend.clone());
        self.storage = Some(backend);
        self
    }

    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// ID 生成器を差し替える（省略時は ULID）
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - backend と config が設定されているかチェック
    /// - 不足があれば BuildError::MissingComponents を返す
    pub fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.account.is_none() || self.documents.is_none() || self.storage.is_none() {
            missing.push("backend");
        }
        if self.config.is_none() {
            missing.push("config");
        }
        let (Some(account), Some(documents), Some(storage), Some(config)) =
            (self.account, self.documents, self.storage, self.config)
        else {
            return Err(BuildError::MissingComponents(missing));
        };

        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        info!(
            endpoint = %config.endpoint,
            database = %config.database_id,
            collection = %config.collection_id,
            bucket = %config.bucket_id,
            "app built"
        );

        Ok(App {
            auth: AuthService::new(account, ids.clone()),
            posts: PostService::new(documents, storage, ids, config.collection(), config.bucket_id),
            state: AppState::new(),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App はサービスと状態をまとめたもの
pub struct App {
    pub auth: AuthService,
    pub posts: PostService,
    pub state: AppState,
}

impl App {
    /// 現在の session を確認して auth 状態に反映する
    pub async fn refresh_session(&mut self) -> Option<&User> {
        match self.auth.current_user().await {
            Some(user) => self.state.dispatch(AuthAction::Login(user)),
            None => self.state.dispatch(AuthAction::Logout),
        }
        self.state.current_user()
    }

    pub async fn logout(&mut self) {
        self.auth.logout().await;
        self.state.dispatch(AuthAction::Logout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{Credentials, NewAccount};
    use crate::impls::InMemoryBackend;
    use crate::ports::SequenceGenerator;

    fn config() -> BackendConfig {
        BackendConfig {
            endpoint: "https://cloud.example.io/v1".into(),
            project_id: "proj".into(),
            database_id: "blog".into(),
            collection_id: "posts".into(),
            bucket_id: "images".into(),
        }
    }

    #[test]
    fn test_build_success() {
        let app = AppBuilder::new()
            .backend(Arc::new(InMemoryBackend::new()))
            .config(config())
            .build()
            .unwrap();
        assert_eq!(app.posts.bucket_id(), "images");
        assert_eq!(app.posts.collection().collection_id, "posts");
    }

    #[test]
    fn test_build_missing_components() {
        let err = AppBuilder::new().build().err().unwrap();
        assert_eq!(err, BuildError::MissingComponents(vec!["backend", "config"]));

        let err = AppBuilder::new()
            .backend(Arc::new(InMemoryBackend::new()))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, BuildError::MissingComponents(vec!["config"]));
    }

    #[tokio::test]
    async fn test_refresh_session_tracks_identity() {
        let mut app = AppBuilder::new()
            .backend(Arc::new(InMemoryBackend::new()))
            .config(config())
            .id_generator(Arc::new(SequenceGenerator::new("id")))
            .build()
            .unwrap();

        assert!(app.refresh_session().await.is_none());

        app.auth
            .create_account(&NewAccount {
                name: "Ada".into(),
                credentials: Credentials::new("ada@example.com", "pw"),
            })
            .await
            .unwrap();
        let user = app.refresh_session().await.cloned().unwrap();
        assert_eq!(user.id.as_str(), "id-1");
        assert!(app.state.auth().is_signed_in());

        app.logout().await;
        assert!(!app.state.auth().is_signed_in());
    }
}
