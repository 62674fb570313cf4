//! InMemoryBackend - 開発用・テスト用のバックエンド
//!
//! 3 つの capability（AccountApi / DocumentsApi / StorageApi）をすべて
//! プロセス内のメモリで実装します。
//!
//! # 学習ポイント
//! - tokio::sync::Mutex による共有状態の保護
//! - 呼び出しジャーナル（順序の検証に使う）
//! - 操作ごとの失敗注入

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::domain::asset::{AssetUpload, StoredFile};
use crate::domain::document::{Document, DocumentList};
use crate::domain::errors::BackendError;
use crate::domain::ids::{AssetId, UserId};
use crate::domain::query::{Query, QueryMethod};
use crate::domain::user::{Session, User};
use crate::ports::{AccountApi, Clock, CollectionRef, DocumentsApi, StorageApi, SystemClock};

/// Operation は失敗注入の単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSessions,
    CreateDocument,
    GetDocument,
    UpdateDocument,
    DeleteDocument,
    ListDocuments,
    CreateFile,
    DeleteFile,
    FileViewUrl,
}

/// BackendCall はジャーナルに記録される 1 回の呼び出し
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateAccount { email: String },
    CreateSession { email: String },
    GetAccount,
    DeleteSessions,
    CreateDocument { id: String, data: Map<String, Value> },
    GetDocument { id: String },
    UpdateDocument { id: String, data: Map<String, Value> },
    DeleteDocument { id: String },
    ListDocuments { queries: Vec<Query> },
    CreateFile { id: AssetId },
    DeleteFile { id: AssetId },
    FileViewUrl { id: AssetId },
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            BackendCall::CreateAccount { .. } => Operation::CreateAccount,
            BackendCall::CreateSession { .. } => Operation::CreateSession,
            BackendCall::GetAccount => Operation::GetAccount,
            BackendCall::DeleteSessions => Operation::DeleteSessions,
            BackendCall::CreateDocument { .. } => Operation::CreateDocument,
            BackendCall::GetDocument { .. } => Operation::GetDocument,
            BackendCall::UpdateDocument { .. } => Operation::UpdateDocument,
            BackendCall::DeleteDocument { .. } => Operation::DeleteDocument,
            BackendCall::ListDocuments { .. } => Operation::ListDocuments,
            BackendCall::CreateFile { .. } => Operation::CreateFile,
            BackendCall::DeleteFile { .. } => Operation::DeleteFile,
            BackendCall::FileViewUrl { .. } => Operation::FileViewUrl,
        }
    }
}

struct Account {
    user: User,
    password: String,
}

struct StoredObject {
    meta: StoredFile,
    bytes: Bytes,
}

#[derive(Default)]
struct InMemoryState {
    /// email -> account
    accounts: HashMap<String, Account>,

    /// 現在の session の持ち主
    session: Option<UserId>,
    next_session: u64,

    /// 挿入順を保持するため Vec で持つ
    collections: HashMap<CollectionRef, Vec<Document>>,

    files: HashMap<(String, AssetId), StoredObject>,

    journal: Vec<BackendCall>,
    failing: HashSet<Operation>,
    blank_file_ids: bool,
}

impl InMemoryState {
    /// 呼び出しを記録し、失敗注入されていればエラーを返す
    fn enter(&mut self, call: BackendCall) -> Result<(), BackendError> {
        let op = call.operation();
        self.journal.push(call);
        if self.failing.contains(&op) {
            return Err(BackendError::transport(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    fn collection_mut(&mut self, collection: &CollectionRef) -> &mut Vec<Document> {
        self.collections.entry(collection.clone()).or_default()
    }

    fn find_document(&self, collection: &CollectionRef, id: &str) -> Option<&Document> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
    }
}

/// InMemoryBackend は開発用・テスト用のバックエンド
///
/// # 使用例
/// ```ignore
/// let backend = Arc::new(InMemoryBackend::new());
/// backend.fail(Operation::CreateFile).await;
/// // ... workflow を実行 ...
/// let calls = backend.calls().await;
/// ```
pub struct InMemoryBackend {
    state: Mutex<InMemoryState>,
    clock: Box<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            clock: Box::new(clock),
        }
    }

    /// 以降の `op` 呼び出しをすべて失敗させる
    pub async fn fail(&self, op: Operation) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: Operation) {
        self.state.lock().await.failing.remove(&op);
    }

    /// create_file が空の ID を返すようにする（保存もしない）
    pub async fn return_blank_file_ids(&self, blank: bool) {
        self.state.lock().await.blank_file_ids = blank;
    }

    /// ここまでの呼び出しを順番どおりに返す
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.journal.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.journal.clear();
    }

    pub async fn has_file(&self, bucket_id: &str, file_id: &AssetId) -> bool {
        self.state
            .lock()
            .await
            .files
            .contains_key(&(bucket_id.to_string(), file_id.clone()))
    }

    pub async fn file_bytes(&self, bucket_id: &str, file_id: &AssetId) -> Option<Bytes> {
        self.state
            .lock()
            .await
            .files
            .get(&(bucket_id.to_string(), file_id.clone()))
            .map(|object| object.bytes.clone())
    }

    pub async fn document(&self, collection: &CollectionRef, id: &str) -> Option<Document> {
        self.state.lock().await.find_document(collection, id).cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountApi for InMemoryBackend {
    async fn create_account(
        &self,
        user_id: &UserId,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::CreateAccount {
            email: email.to_string(),
        })?;
        if state.accounts.contains_key(email) {
            return Err(BackendError::conflict(format!(
                "A user with the same email '{email}' already exists"
            )));
        }
        if state.accounts.values().any(|a| &a.user.id == user_id) {
            return Err(BackendError::conflict(format!(
                "A user with the same id '{user_id}' already exists"
            )));
        }
        let user = User {
            id: user_id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Some(self.clock.now()),
        };
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        Ok(user)
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::CreateSession {
            email: email.to_string(),
        })?;
        let user_id = match state.accounts.get(email) {
            Some(account) if account.password == password => account.user.id.clone(),
            _ => {
                return Err(BackendError::unauthorized(
                    "Invalid credentials. Please check the email and password.",
                ));
            }
        };
        state.next_session += 1;
        state.session = Some(user_id.clone());
        Ok(Session {
            id: format!("session-{}", state.next_session),
            user_id,
            expire: None,
        })
    }

    async fn get_account(&self) -> Result<User, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::GetAccount)?;
        let Some(user_id) = state.session.clone() else {
            return Err(BackendError::unauthorized("User (role: guests) missing scope (account)"));
        };
        state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| BackendError::not_found(format!("user {user_id} not found")))
    }

    async fn delete_sessions(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::DeleteSessions)?;
        if state.session.take().is_none() {
            return Err(BackendError::unauthorized("no active session"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentsApi for InMemoryBackend {
    async fn create_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::CreateDocument {
            id: document_id.to_string(),
            data: data.clone(),
        })?;
        if document_id.is_empty() {
            return Err(BackendError::http_status(400, "Invalid documentId: must not be empty"));
        }
        if state.find_document(collection, document_id).is_some() {
            return Err(BackendError::conflict(format!(
                "Document with the requested ID '{document_id}' already exists."
            )));
        }
        let now = self.clock.now();
        let document = Document {
            id: document_id.to_string(),
            created_at: Some(now),
            updated_at: Some(now),
            attributes: data,
        };
        state.collection_mut(collection).push(document.clone());
        Ok(document)
    }

    async fn get_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<Document, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::GetDocument {
            id: document_id.to_string(),
        })?;
        state
            .find_document(collection, document_id)
            .cloned()
            .ok_or_else(|| not_found_document(document_id))
    }

    async fn update_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::UpdateDocument {
            id: document_id.to_string(),
            data: data.clone(),
        })?;
        let now = self.clock.now();
        let document = state
            .collection_mut(collection)
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found_document(document_id))?;
        for (key, value) in data {
            document.attributes.insert(key, value);
        }
        document.updated_at = Some(now);
        Ok(document.clone())
    }

    async fn delete_document(
        &self,
        collection: &CollectionRef,
        document_id: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::DeleteDocument {
            id: document_id.to_string(),
        })?;
        let documents = state.collection_mut(collection);
        let before = documents.len();
        documents.retain(|d| d.id != document_id);
        if documents.len() == before {
            return Err(not_found_document(document_id));
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &CollectionRef,
        queries: &[Query],
    ) -> Result<DocumentList, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::ListDocuments {
            queries: queries.to_vec(),
        })?;
        let all = state.collections.get(collection).cloned().unwrap_or_default();
        Ok(apply_queries(all, queries))
    }
}

#[async_trait]
impl StorageApi for InMemoryBackend {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &AssetId,
        upload: AssetUpload,
    ) -> Result<StoredFile, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::CreateFile {
            id: file_id.clone(),
        })?;
        if state.blank_file_ids {
            return Ok(StoredFile {
                id: AssetId::new(""),
                bucket_id: bucket_id.to_string(),
                name: upload.file_name,
                mime_type: upload.content_type,
                size: 0,
            });
        }
        let key = (bucket_id.to_string(), file_id.clone());
        if state.files.contains_key(&key) {
            return Err(BackendError::conflict(format!(
                "A storage file with the requested ID '{file_id}' already exists."
            )));
        }
        let meta = StoredFile {
            id: file_id.clone(),
            bucket_id: bucket_id.to_string(),
            name: upload.file_name,
            mime_type: upload.content_type,
            size: upload.bytes.len() as u64,
        };
        state.files.insert(
            key,
            StoredObject {
                meta: meta.clone(),
                bytes: upload.bytes,
            },
        );
        Ok(meta)
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &AssetId) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::DeleteFile {
            id: file_id.clone(),
        })?;
        state
            .files
            .remove(&(bucket_id.to_string(), file_id.clone()))
            .map(|_| ())
            .ok_or_else(|| not_found_file(file_id))
    }

    async fn file_view_url(
        &self,
        bucket_id: &str,
        file_id: &AssetId,
    ) -> Result<String, BackendError> {
        let mut state = self.state.lock().await;
        state.enter(BackendCall::FileViewUrl {
            id: file_id.clone(),
        })?;
        let key = (bucket_id.to_string(), file_id.clone());
        match state.files.get(&key) {
            Some(object) => Ok(format!(
                "memory://{}/{}/view",
                object.meta.bucket_id, object.meta.id
            )),
            None => Err(not_found_file(file_id)),
        }
    }
}

fn not_found_document(id: &str) -> BackendError {
    BackendError::not_found(format!("Document with the requested ID '{id}' could not be found."))
}

fn not_found_file(id: &AssetId) -> BackendError {
    BackendError::not_found(format!("The requested file '{id}' could not be found."))
}

/// `$id` などのメタ attribute も含めて値を取り出す
fn attribute_value(document: &Document, name: &str) -> Value {
    match name {
        "$id" => Value::from(document.id.clone()),
        "$createdAt" => document
            .created_at
            .map(|t| Value::from(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        "$updatedAt" => document
            .updated_at
            .map(|t| Value::from(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        other => document.attribute(other).cloned().unwrap_or(Value::Null),
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// filter → order → offset/limit の順に適用する
///
/// `total` は filter 後・ページング前の件数。
fn apply_queries(mut documents: Vec<Document>, queries: &[Query]) -> DocumentList {
    for query in queries {
        let Some(attribute) = query.attribute.as_deref() else {
            continue;
        };
        match query.method {
            QueryMethod::Equal => {
                documents.retain(|d| query.values.contains(&attribute_value(d, attribute)))
            }
            QueryMethod::NotEqual => {
                documents.retain(|d| !query.values.contains(&attribute_value(d, attribute)))
            }
            _ => {}
        }
    }

    // 後から指定した order ほど優先度が低い（安定ソートを逆順に適用）
    for query in queries.iter().rev() {
        let Some(attribute) = query.attribute.as_deref() else {
            continue;
        };
        match query.method {
            QueryMethod::OrderAsc => documents.sort_by(|a, b| {
                compare_values(&attribute_value(a, attribute), &attribute_value(b, attribute))
            }),
            QueryMethod::OrderDesc => documents.sort_by(|a, b| {
                compare_values(&attribute_value(b, attribute), &attribute_value(a, attribute))
            }),
            _ => {}
        }
    }

    let total = documents.len() as u64;
    let offset = queries
        .iter()
        .rev()
        .find(|q| q.method == QueryMethod::Offset)
        .and_then(Query::count)
        .unwrap_or(0) as usize;
    let limit = queries
        .iter()
        .rev()
        .find(|q| q.method == QueryMethod::Limit)
        .and_then(Query::count)
        .unwrap_or(25) as usize;

    DocumentList {
        total,
        documents: documents.into_iter().skip(offset).take(limit).collect(),
    }
}
