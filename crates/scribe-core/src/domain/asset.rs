//! Asset - featured image のアップロード入力とバケット上のメタ情報

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::ids::AssetId;

/// フォームが受け付ける画像の拡張子
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("unsupported image type '{0}' (accepted: png, jpg, jpeg, gif)")]
    UnsupportedType(String),

    #[error("failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Binary payload waiting to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl AssetUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// ファイルを読み込んで AssetUpload を作る
    ///
    /// 拡張子が `ACCEPTED_EXTENSIONS` にない場合は読み込む前に拒否します。
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let content_type = content_type_for(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for AssetUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> Result<&'static str, AssetError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        _ => Err(AssetError::UnsupportedType(ext)),
    }
}

/// Metadata of a file stored in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: AssetId,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}
