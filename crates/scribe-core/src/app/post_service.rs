//! PostService - posts collection と画像バケットに限定したファサード
//!
//! # 失敗の扱い
//! - create / update / get / list / upload: ログに残してそのまま返す
//! - delete_post / delete_asset: ログに残して `false` を返す（呼び出し側が後続の
//!   片付けをするか決める）
//! - resolve_asset_url: 失敗はすべて `None`（「画像なし」）

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::asset::AssetUpload;
use crate::domain::document::to_attributes;
use crate::domain::errors::BackendError;
use crate::domain::ids::{AssetId, PostId};
use crate::domain::post::{Post, PostFields, PostPatch, PostStatus};
use crate::domain::query::Query;
use crate::ports::{CollectionRef, DocumentsApi, IdGenerator, StorageApi};

pub struct PostService {
    documents: Arc<dyn DocumentsApi>,
    storage: Arc<dyn StorageApi>,
    ids: Arc<dyn IdGenerator>,
    collection: CollectionRef,
    bucket_id: String,
}

impl PostService {
    pub fn new(
        documents: Arc<dyn DocumentsApi>,
        storage: Arc<dyn StorageApi>,
        ids: Arc<dyn IdGenerator>,
        collection: CollectionRef,
        bucket_id: impl Into<String>,
    ) -> Self {
        Self {
            documents,
            storage,
            ids,
            collection,
            bucket_id: bucket_id.into(),
        }
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// slug を ID として post document を作成
    ///
    /// 同じ slug が存在すれば `ErrorKind::Conflict`。
    pub async fn create_post(&self, id: &PostId, fields: &PostFields) -> Result<Post, BackendError> {
        let result = async {
            let data = to_attributes(fields)?;
            let document = self
                .documents
                .create_document(&self.collection, id.as_str(), data)
                .await?;
            Post::from_document(&document)
        }
        .await;
        if let Err(e) = &result {
            error!(post_id = %id, error = %e, "create_post failed");
        }
        result
    }

    pub async fn update_post(&self, id: &PostId, patch: &PostPatch) -> Result<Post, BackendError> {
        let result = async {
            let data = to_attributes(patch)?;
            let document = self
                .documents
                .update_document(&self.collection, id.as_str(), data)
                .await?;
            Post::from_document(&document)
        }
        .await;
        if let Err(e) = &result {
            error!(post_id = %id, error = %e, "update_post failed");
        }
        result
    }

    /// 成功したかどうかだけを返す
    pub async fn delete_post(&self, id: &PostId) -> bool {
        match self
            .documents
            .delete_document(&self.collection, id.as_str())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(post_id = %id, error = %e, "delete_post failed");
                false
            }
        }
    }

    pub async fn get_post(&self, id: &PostId) -> Result<Post, BackendError> {
        let result = async {
            let document = self
                .documents
                .get_document(&self.collection, id.as_str())
                .await?;
            Post::from_document(&document)
        }
        .await;
        if let Err(e) = &result {
            error!(post_id = %id, error = %e, "get_post failed");
        }
        result
    }

    pub async fn list_posts(&self, queries: &[Query]) -> Result<Vec<Post>, BackendError> {
        let result = async {
            let list = self
                .documents
                .list_documents(&self.collection, queries)
                .await?;
            list.documents
                .iter()
                .map(Post::from_document)
                .collect::<Result<Vec<_>, _>>()
        }
        .await;
        if let Err(e) = &result {
            error!(queries = queries.len(), error = %e, "list_posts failed");
        }
        result
    }

    /// ホームのフィード（active な post のみ）
    pub async fn active_feed(&self) -> Result<Vec<Post>, BackendError> {
        self.list_posts(&[Query::equal("status", PostStatus::Active.as_str())])
            .await
    }

    /// 画像をアップロードして生成された ID を返す
    ///
    /// レスポンスの ID が空なら失敗として扱う。
    pub async fn upload_asset(&self, upload: AssetUpload) -> Result<AssetId, BackendError> {
        let file_id = self.ids.generate_asset_id();
        debug!(asset_id = %file_id, file = %upload.file_name, bytes = upload.len(), "uploading asset");
        let result = match self
            .storage
            .create_file(&self.bucket_id, &file_id, upload)
            .await
        {
            Ok(stored) if stored.id.is_empty() => Err(BackendError::decode(
                "upload response carried no file identifier",
            )),
            Ok(stored) => Ok(stored.id),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(asset_id = %file_id, error = %e, "upload_asset failed");
        }
        result
    }

    pub async fn delete_asset(&self, id: &AssetId) -> bool {
        match self.storage.delete_file(&self.bucket_id, id).await {
            Ok(()) => true,
            Err(e) => {
                error!(asset_id = %id, error = %e, "delete_asset failed");
                false
            }
        }
    }

    /// 画像 ID を表示用 URL に解決する。失敗しても raise しない。
    pub async fn resolve_asset_url(&self, id: Option<&AssetId>) -> Option<String> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            warn!("resolve_asset_url called without an asset id");
            return None;
        };
        match self.storage.file_view_url(&self.bucket_id, id).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(asset_id = %id, error = %e, "resolve_asset_url failed");
                None
            }
        }
    }
}
