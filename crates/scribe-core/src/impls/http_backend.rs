//! HttpBackend - プラットフォームの REST API を話すクライアント
//!
//! SDK を使わず、公開されている REST 面を `reqwest` で直接呼び出します。
//!
//! # Session の扱い
//! ブラウザ以外のクライアントでは cookie が使えないため、プラットフォームは
//! session 作成時に `X-Fallback-Cookies` ヘッダーで cookie の内容を返します。
//! 以降のリクエストでは同じ値を `X-Fallback-Cookies` として送り返します。
//! CLI はこの値をファイルに保存して、プロセスをまたいで session を維持します。

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::BackendConfig;
use crate::domain::asset::{AssetUpload, StoredFile};
use crate::domain::document::{Document, DocumentList};
use crate::domain::errors::BackendError;
use crate::domain::ids::{AssetId, UserId};
use crate::domain::query::Query;
use crate::domain::user::{Session, User};
use crate::ports::{AccountApi, CollectionRef, DocumentsApi, StorageApi};

pub const PROJECT_HEADER: &str = "X-Appwrite-Project";
pub const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

/// プラットフォームのエラーレスポンス
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// HttpBackend は REST API のクライアント
pub struct HttpBackend {
    endpoint: Url,
    project_id: String,
    http: reqwest::Client,
    session: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &BackendConfig, http: reqwest::Client) -> Result<Self, BackendError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            BackendError::new(
                crate::domain::ErrorKind::Rejected,
                format!("invalid endpoint {}: {e}", config.endpoint),
            )
        })?;
        Ok(Self {
            endpoint,
            project_id: config.project_id.clone(),
            http,
            session: RwLock::new(None),
        })
    }

    /// 現在の session（`X-Fallback-Cookies` の値）
    pub fn session_cookies(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 保存しておいた session を復元する
    pub fn restore_session(&self, cookies: impl Into<String>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(cookies.into());
    }

    pub fn clear_session(&self) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::transport(format!("endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, BackendError> {
        let url = self.url(segments)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(PROJECT_HEADER, &self.project_id);
        if let Some(cookies) = self.session_cookies() {
            builder = builder.header(FALLBACK_COOKIES_HEADER, cookies);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(|e| {
            BackendError::decode(format!("unexpected response body: {e}")).with_source(e)
        })
    }

    fn document_segments<'a>(collection: &'a CollectionRef) -> [&'a str; 5] {
        [
            "databases",
            &collection.database_id,
            "collections",
            &collection.collection_id,
            "documents",
        ]
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> BackendError {
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request error: {e}")
    };
    BackendError::transport(message).with_source(e)
}

fn error_from_body(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let message = match parsed.kind {
                Some(kind) => format!("{} ({kind})", parsed.message),
                None => parsed.message,
            };
            BackendError::http_status(status, message)
        }
        Err(_) if body.is_empty() => BackendError::http_status(status, format!("HTTP {status}")),
        Err(_) => BackendError::http_status(status, body.to_string()),
    }
}

#[async_trait]
impl AccountApi for HttpBackend {
    async fn create_account(
        &self,
        user_id: &UserId,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let builder = self.request(Method::POST, &["account"])?.json(&json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        }));
        self.send_json(builder).await
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let builder = self
            .request(Method::POST, &["account", "sessions", "email"])?
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(builder).await?;

        if let Some(cookies) = response
            .headers()
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            debug!("session cookies received");
            self.restore_session(cookies);
        }

        response.json::<Session>().await.map_err(|e| {
            BackendError::decode(format!("unexpected session body: {e}")).with_source(e)
        })
    }

    async fn get_account(&self) -> Result<User, BackendError> {
        let builder = self.request(Method::GET, &["account"])?;
        self.send_json(builder).await
    }

    async fn delete_sessions(&self) -> Result<(), BackendError> {
        let builder = self.request(Method::DELETE, &["account", "sessions"])?;
        let result = self.send(builder).await.map(|_| ());
        // サーバー側の結果に関わらずローカルの session は捨てる
        self.clear_session();
        result
    }
}

#[async_trait]
impl DocumentsApi for HttpBackend {
    async fn create_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError> {
        let builder = self
            .request(Method::POST, &Self::document_segments(collection))?
            .json(&json!({ "documentId": document_id, "data": data }));
        self.send_json(builder).await
    }

    async fn get_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<Document, BackendError> {
        let mut segments = Self::document_segments(collection).to_vec();
        segments.push(document_id);
        let builder = self.request(Method::GET, &segments)?;
        self.send_json(builder).await
    }

    async fn update_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError> {
        let mut segments = Self::document_segments(collection).to_vec();
        segments.push(document_id);
        let builder = self
            .request(Method::PATCH, &segments)?
            .json(&json!({ "data": data }));
        self.send_json(builder).await
    }

    async fn delete_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<(), BackendError> {
        let mut segments = Self::document_segments(collection).to_vec();
        segments.push(document_id);
        let builder = self.request(Method::DELETE, &segments)?;
        self.send(builder).await.map(|_| ())
    }

    async fn list_documents(
        &self,
        collection: &CollectionRef,
        queries: &[Query],
    ) -> Result<DocumentList, BackendError> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|q| ("queries[]", q.to_param()))
            .collect();
        let builder = self
            .request(Method::GET, &Self::document_segments(collection))?
            .query(&params);
        self.send_json(builder).await
    }
}

#[async_trait]
impl StorageApi for HttpBackend {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &AssetId,
        upload: AssetUpload,
    ) -> Result<StoredFile, BackendError> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| {
                BackendError::new(
                    crate::domain::ErrorKind::Rejected,
                    format!("invalid content type {}: {e}", upload.content_type),
                )
            })?;
        let form = Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);
        let builder = self
            .request(Method::POST, &["storage", "buckets", bucket_id, "files"])?
            .multipart(form);
        self.send_json(builder).await
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &AssetId) -> Result<(), BackendError> {
        let builder = self.request(
            Method::DELETE,
            &["storage", "buckets", bucket_id, "files", file_id.as_str()],
        )?;
        self.send(builder).await.map(|_| ())
    }

    /// URL を組み立てるだけで通信はしない
    async fn file_view_url(
        &self,
        bucket_id: &str,
        file_id: &AssetId,
    ) -> Result<String, BackendError> {
        let mut url = self.url(&["storage", "buckets", bucket_id, "files", file_id.as_str(), "view"])?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url.to_string())
    }
}
