//! StorageApi port - バケットへのファイル保存
//!
//! 画像などのバイナリは document とは別に、バケット単位で保存されます。

use async_trait::async_trait;

use crate::domain::asset::{AssetUpload, StoredFile};
use crate::domain::errors::BackendError;
use crate::domain::ids::AssetId;

/// StorageApi はバイナリストレージの capability
///
/// # 契約
/// - `create_file`: 呼び出し側が生成した `file_id` で保存する
/// - `file_view_url`: ブラウザなどから直接取得できる URL を返す
#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &AssetId,
        upload: AssetUpload,
    ) -> Result<StoredFile, BackendError>;

    async fn delete_file(&self, bucket_id: &str, file_id: &AssetId) -> Result<(), BackendError>;

    async fn file_view_url(&self, bucket_id: &str, file_id: &AssetId)
    -> Result<String, BackendError>;
}
