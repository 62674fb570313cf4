//! Backend configuration (endpoint, project, database, collection, bucket).
//!
//! 起動時に環境変数から読み込みます。`.env` があればそれも読みます。
//! ここで確認するのは値の有無と endpoint の URL 形式だけで、
//! collection の schema などはプラットフォーム側の責務です。

use reqwest::Url;
use tracing::debug;

use crate::ports::CollectionRef;

pub const ENV_ENDPOINT: &str = "APPWRITE_URL";
pub const ENV_PROJECT_ID: &str = "APPWRITE_PROJECT_ID";
pub const ENV_DATABASE_ID: &str = "APPWRITE_DATABASE_ID";
pub const ENV_COLLECTION_ID: &str = "APPWRITE_COLLECTION_ID";
pub const ENV_BUCKET_ID: &str = "APPWRITE_BUCKET_ID";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// 例: `https://cloud.appwrite.io/v1`（末尾の `/` は除去済み）
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub bucket_id: String,
}

impl BackendConfig {
    /// 環境変数（と `.env`）から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) => debug!(error = %e, "no .env loaded"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の lookup 関数から読み込む（テストでは HashMap を渡す）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let endpoint = normalize_endpoint(&required(ENV_ENDPOINT)?)?;
        Ok(Self {
            endpoint,
            project_id: required(ENV_PROJECT_ID)?,
            database_id: required(ENV_DATABASE_ID)?,
            collection_id: required(ENV_COLLECTION_ID)?,
            bucket_id: required(ENV_BUCKET_ID)?,
        })
    }

    /// posts collection への参照
    pub fn collection(&self) -> CollectionRef {
        CollectionRef::new(&self.database_id, &self.collection_id)
    }
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEndpoint {
            value: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
