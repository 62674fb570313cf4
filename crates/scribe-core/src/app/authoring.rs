//! Authoring workflow - post の作成・編集フォーム
//!
//! # submit の流れ
//! 1. 新しい画像があればアップロード（失敗したらここで中断し、document は書かない）
//! 2. アップロード成功 かつ 編集中 かつ 以前の画像あり → 以前の画像を削除
//! 3. 保存する画像 ID = 新しい ID、なければ以前の ID、なければ null
//! 4. 編集中なら update して詳細ページへ
//! 5. そうでなければ slug を ID として create して詳細ページへ
//!
//! 手順 2 の削除は、後続の update が失敗しても取り消されません。

use tracing::{debug, error, info};

use crate::app::post_service::PostService;
use crate::domain::asset::AssetUpload;
use crate::domain::errors::BackendError;
use crate::domain::ids::{AssetId, PostId};
use crate::domain::post::{Post, PostFields, PostPatch, PostStatus};
use crate::domain::route::Route;
use crate::domain::slug::slugify;
use crate::domain::user::User;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid form: {0}")]
    Invalid(&'static str),

    #[error("sign in to create a post")]
    NotAuthenticated,

    #[error("image upload failed: {0}")]
    UploadFailed(#[source] BackendError),

    #[error("saving the post failed: {0}")]
    Write(#[source] BackendError),
}

/// PostForm は作成・編集フォームの状態
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    title: String,
    slug: String,
    content: String,
    status: PostStatus,
    image: Option<AssetUpload>,
    editing: Option<Post>,
}

impl PostForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の post から編集フォームを作る（slug は post の ID）
    pub fn edit(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.id.to_string(),
            content: post.content.clone(),
            status: post.status,
            image: None,
            editing: Some(post.clone()),
        }
    }

    /// タイトルを変えると slug も再計算される
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.slug = slugify(&self.title);
    }

    /// 手入力の slug にも同じ変換をかける。後から呼ばれた方が勝つ。
    pub fn set_slug(&mut self, slug: &str) {
        self.slug = slugify(slug);
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn set_status(&mut self, status: PostStatus) {
        self.status = status;
    }

    pub fn attach_image(&mut self, upload: AssetUpload) {
        self.image = Some(upload);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> PostStatus {
        self.status
    }

    pub fn image(&self) -> Option<&AssetUpload> {
        self.image.as_ref()
    }

    pub fn editing(&self) -> Option<&Post> {
        self.editing.as_ref()
    }

    /// 編集中の post の現在の画像をプレビュー用 URL に解決する
    pub async fn preview_url(&self, service: &PostService) -> Option<String> {
        let image = self.editing.as_ref()?.featured_image.as_ref()?;
        service.resolve_asset_url(Some(image)).await
    }

    fn validate(&self, user: Option<&User>) -> Result<(), SubmitError> {
        if self.title.trim().is_empty() {
            return Err(SubmitError::Invalid("title is required"));
        }
        if self.editing.is_none() {
            if self.slug.is_empty() {
                return Err(SubmitError::Invalid("slug is required"));
            }
            // アップロード前に確認しておけば画像が孤立しない
            if user.is_none() {
                return Err(SubmitError::NotAuthenticated);
            }
        }
        Ok(())
    }

    pub async fn submit(
        &self,
        service: &PostService,
        user: Option<&User>,
    ) -> Result<Route, SubmitError> {
        self.validate(user)?;

        let uploaded: Option<AssetId> = match &self.image {
            Some(upload) => match service.upload_asset(upload.clone()).await {
                Ok(id) => Some(id),
                Err(e) => {
                    error!(slug = %self.slug, error = %e, "submit aborted: image upload failed");
                    return Err(SubmitError::UploadFailed(e));
                }
            },
            None => None,
        };

        let previous = self
            .editing
            .as_ref()
            .and_then(|post| post.featured_image.clone());

        if let (Some(new_id), Some(old_id)) = (&uploaded, &previous) {
            debug!(old = %old_id, new = %new_id, "replacing featured image");
            service.delete_asset(old_id).await;
        }

        let featured_image = uploaded.or(previous);

        match (&self.editing, user) {
            (Some(post), _) => {
                let patch = PostPatch {
                    title: Some(self.title.clone()),
                    content: Some(self.content.clone()),
                    status: Some(self.status),
                    featured_image: Some(featured_image),
                };
                service
                    .update_post(&post.id, &patch)
                    .await
                    .map_err(SubmitError::Write)?;
                info!(post_id = %post.id, "post updated");
                Ok(Route::Post(post.id.clone()))
            }
            (None, Some(user)) => {
                let id = PostId::new(self.slug.clone());
                let fields = PostFields {
                    title: self.title.clone(),
                    content: self.content.clone(),
                    featured_image,
                    status: self.status,
                    user_id: user.id.clone(),
                };
                service
                    .create_post(&id, &fields)
                    .await
                    .map_err(SubmitError::Write)?;
                info!(post_id = %id, "post created");
                Ok(Route::Post(id))
            }
            (None, None) => Err(SubmitError::NotAuthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Value, json};

    use crate::domain::ErrorKind;
    use crate::domain::ids::UserId;
    use crate::impls::{BackendCall, InMemoryBackend, Operation};
    use crate::ports::{CollectionRef, DocumentsApi, IdGenerator, SequenceGenerator, StorageApi};

    const BUCKET: &str = "images";

    /// 毎回同じ asset ID を返す
    struct FixedIds(&'static str);

    impl IdGenerator for FixedIds {
        fn generate_asset_id(&self) -> AssetId {
            AssetId::new(self.0)
        }

        fn generate_user_id(&self) -> UserId {
            UserId::new("user")
        }
    }

    fn collection() -> CollectionRef {
        CollectionRef::new("blog", "posts")
    }

    fn service_with(backend: &Arc<InMemoryBackend>, ids: Arc<dyn IdGenerator>) -> PostService {
        PostService::new(backend.clone(), backend.clone(), ids, collection(), BUCKET)
    }

    fn author() -> User {
        User {
            id: UserId::new("u1"),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            created_at: None,
        }
    }

    fn png() -> AssetUpload {
        AssetUpload::new("cover.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    /// featuredImage = "imgA" の post "p" を用意する
    async fn seed_post_with_image(backend: &InMemoryBackend) -> Post {
        backend
            .create_file(BUCKET, &AssetId::new("imgA"), png())
            .await
            .unwrap();
        let data = json!({
            "title": "Old",
            "content": "old body",
            "featuredImage": "imgA",
            "status": "active",
            "userId": "u1",
        });
        let Value::Object(data) = data else { unreachable!() };
        let doc = backend.create_document(&collection(), "p", data).await.unwrap();
        backend.clear_calls().await;
        Post::from_document(&doc).unwrap()
    }

    #[tokio::test]
    async fn create_without_image_derives_the_slug() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let mut form = PostForm::new();
        form.set_title("Hello, World! 2024");
        form.set_content("<p>hi</p>");

        let route = form.submit(&service, Some(&author())).await.unwrap();
        assert_eq!(route, Route::Post(PostId::new("hello-world-2024")));

        let calls = backend.calls().await;
        assert_eq!(calls.len(), 1);
        let BackendCall::CreateDocument { id, data } = &calls[0] else {
            panic!("expected create, got {calls:?}");
        };
        assert_eq!(id, "hello-world-2024");
        assert_eq!(
            Value::Object(data.clone()),
            json!({
                "title": "Hello, World! 2024",
                "content": "<p>hi</p>",
                "featuredImage": null,
                "status": "active",
                "userId": "u1",
            })
        );
    }

    #[tokio::test]
    async fn edit_with_new_image_replaces_the_old_one_in_order() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        let service = service_with(&backend, Arc::new(FixedIds("imgB")));

        let mut form = PostForm::edit(&post);
        form.set_title("New title");
        form.attach_image(png());

        let route = form.submit(&service, Some(&author())).await.unwrap();
        assert_eq!(route, Route::Post(PostId::new("p")));

        let calls = backend.calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], BackendCall::CreateFile { id: AssetId::new("imgB") });
        assert_eq!(calls[1], BackendCall::DeleteFile { id: AssetId::new("imgA") });
        let BackendCall::UpdateDocument { id, data } = &calls[2] else {
            panic!("expected update, got {:?}", calls[2]);
        };
        assert_eq!(id, "p");
        assert_eq!(data.get("featuredImage"), Some(&json!("imgB")));
        assert_eq!(data.get("title"), Some(&json!("New title")));

        assert!(!backend.has_file(BUCKET, &AssetId::new("imgA")).await);
        let stored = service.get_post(&PostId::new("p")).await.unwrap();
        assert_eq!(stored.featured_image, Some(AssetId::new("imgB")));
    }

    #[tokio::test]
    async fn edit_without_new_image_keeps_the_old_one() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        let service = service_with(&backend, Arc::new(FixedIds("imgB")));

        let mut form = PostForm::edit(&post);
        form.set_content("new body");
        form.submit(&service, Some(&author())).await.unwrap();

        let calls = backend.calls().await;
        assert_eq!(calls.len(), 1);
        let BackendCall::UpdateDocument { data, .. } = &calls[0] else {
            panic!("expected update, got {calls:?}");
        };
        assert_eq!(data.get("featuredImage"), Some(&json!("imgA")));
    }

    #[tokio::test]
    async fn failed_upload_writes_nothing() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        backend.fail(Operation::CreateFile).await;
        let service = service_with(&backend, Arc::new(FixedIds("imgB")));

        let mut edit = PostForm::edit(&post);
        edit.attach_image(png());
        let err = edit.submit(&service, Some(&author())).await.unwrap_err();
        assert!(matches!(err, SubmitError::UploadFailed(_)));

        let mut create = PostForm::new();
        create.set_title("Fresh");
        create.attach_image(png());
        let err = create.submit(&service, Some(&author())).await.unwrap_err();
        assert!(matches!(err, SubmitError::UploadFailed(_)));

        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(ops, vec![Operation::CreateFile, Operation::CreateFile]);
        assert!(backend.has_file(BUCKET, &AssetId::new("imgA")).await);
    }

    #[tokio::test]
    async fn failed_old_image_deletion_still_updates() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        backend.fail(Operation::DeleteFile).await;
        let service = service_with(&backend, Arc::new(FixedIds("imgB")));

        let mut form = PostForm::edit(&post);
        form.attach_image(png());
        let route = form.submit(&service, Some(&author())).await.unwrap();
        assert_eq!(route, Route::Post(PostId::new("p")));

        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(
            ops,
            vec![Operation::CreateFile, Operation::DeleteFile, Operation::UpdateDocument]
        );
        let stored = service.get_post(&PostId::new("p")).await.unwrap();
        assert_eq!(stored.featured_image, Some(AssetId::new("imgB")));
        assert!(backend.has_file(BUCKET, &AssetId::new("imgA")).await);
    }

    #[tokio::test]
    async fn failed_update_leaves_old_image_deleted() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        backend.fail(Operation::UpdateDocument).await;
        let service = service_with(&backend, Arc::new(FixedIds("imgB")));

        let mut form = PostForm::edit(&post);
        form.attach_image(png());
        let err = form.submit(&service, Some(&author())).await.unwrap_err();
        assert!(matches!(err, SubmitError::Write(_)));

        // 削除済みの imgA を参照したまま、imgB は孤立する（補償はしない）
        assert!(!backend.has_file(BUCKET, &AssetId::new("imgA")).await);
        assert!(backend.has_file(BUCKET, &AssetId::new("imgB")).await);
        let doc = backend.document(&collection(), "p").await.unwrap();
        assert_eq!(doc.attribute("featuredImage"), Some(&json!("imgA")));

        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(
            ops,
            vec![Operation::CreateFile, Operation::DeleteFile, Operation::UpdateDocument]
        );
    }

    #[tokio::test]
    async fn create_with_taken_slug_is_a_write_conflict() {
        let backend = Arc::new(InMemoryBackend::new());
        seed_post_with_image(&backend).await;
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let mut form = PostForm::new();
        form.set_title("P");
        let err = form.submit(&service, Some(&author())).await.unwrap_err();

        let SubmitError::Write(source) = &err else {
            panic!("expected write error, got {err:?}");
        };
        assert_eq!(source.kind(), ErrorKind::Conflict);
        let doc = backend.document(&collection(), "p").await.unwrap();
        assert_eq!(doc.attribute("title"), Some(&json!("Old")));
    }

    #[tokio::test]
    async fn blank_upload_identifier_aborts_the_submit() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.return_blank_file_ids(true).await;
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let mut form = PostForm::new();
        form.set_title("With image");
        form.attach_image(png());
        let err = form.submit(&service, Some(&author())).await.unwrap_err();
        assert!(matches!(err, SubmitError::UploadFailed(_)));

        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(ops, vec![Operation::CreateFile]);
    }

    #[tokio::test]
    async fn create_requires_identity_before_uploading() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let mut form = PostForm::new();
        form.set_title("Anonymous");
        form.attach_image(png());
        let err = form.submit(&service, None).await.unwrap_err();

        assert!(matches!(err, SubmitError::NotAuthenticated));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn empty_title_or_slug_is_rejected_locally() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let form = PostForm::new();
        assert!(matches!(
            form.submit(&service, Some(&author())).await,
            Err(SubmitError::Invalid(_))
        ));

        let mut form = PostForm::new();
        form.set_title("!!!");
        assert_eq!(form.slug(), "");
        assert!(matches!(
            form.submit(&service, Some(&author())).await,
            Err(SubmitError::Invalid(_))
        ));
        assert!(backend.calls().await.is_empty());
    }

    #[test]
    fn last_slug_write_wins() {
        let mut form = PostForm::new();
        form.set_title("First Title");
        assert_eq!(form.slug(), "first-title");

        form.set_slug("My Custom Slug");
        assert_eq!(form.slug(), "my-custom-slug");

        form.set_title("Second Title");
        assert_eq!(form.slug(), "second-title");
    }

    #[tokio::test]
    async fn slug_edits_do_not_move_an_existing_post() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        let mut form = PostForm::edit(&post);
        form.set_slug("somewhere-else");
        let route = form.submit(&service, Some(&author())).await.unwrap();

        assert_eq!(route, Route::Post(PostId::new("p")));
        assert!(backend.document(&collection(), "somewhere-else").await.is_none());
    }

    #[tokio::test]
    async fn preview_resolves_only_existing_images() {
        let backend = Arc::new(InMemoryBackend::new());
        let post = seed_post_with_image(&backend).await;
        let service = service_with(&backend, Arc::new(SequenceGenerator::new("img")));

        assert_eq!(PostForm::new().preview_url(&service).await, None);
        assert!(backend.calls().await.is_empty());

        let url = PostForm::edit(&post).preview_url(&service).await;
        assert_eq!(url.as_deref(), Some("memory://images/imgA/view"));
    }
}
