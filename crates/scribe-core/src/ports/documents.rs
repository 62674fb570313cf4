//! DocumentsApi port - document store の CRUD
//!
//! document は `database_id` / `collection_id` の組で区切られた名前空間に属します。
//! attribute は型なしの JSON（`serde_json::Map`）として受け渡します。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::document::{Document, DocumentList};
use crate::domain::errors::BackendError;
use crate::domain::query::Query;

/// CollectionRef は document の名前空間
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub database_id: String,
    pub collection_id: String,
}

impl CollectionRef {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// DocumentsApi は document store の capability
///
/// # 契約
/// - `create_document`: 同じ ID が存在すれば `ErrorKind::Conflict`
/// - `update_document`: 渡した attribute だけを既存の document にマージ
/// - `get_document` / `update_document` / `delete_document`: 存在しなければ `ErrorKind::NotFound`
#[async_trait]
pub trait DocumentsApi: Send + Sync {
    async fn create_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError>;

    async fn get_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<Document, BackendError>;

    async fn update_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError>;

    async fn delete_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<(), BackendError>;

    async fn list_documents(
        &self,
        collection: &CollectionRef,
        queries: &[Query],
    ) -> Result<DocumentList, BackendError>;
}
