//! Views - フィードのカードと詳細ページ
//!
//! どちらも featured image を `ImageSlot` で解決します。
//!
//! # ImageSlot の状態遷移
//! ```text
//! set_image(None)        → Unavailable（解決は呼ばない）
//! set_image(Some(id))    → Loading ─┬─ complete(Some(url)) → Resolved(url) ─ image_failed() → Unavailable
//!                                   └─ complete(None)      → Unavailable
//! ```
//! 識別子が変わるたびに世代番号が進み、古い `Resolution` や unmount 後の
//! `complete` は無視されます。

use tracing::{debug, warn};

use crate::app::post_service::PostService;
use crate::app::store::{AppState, PostsAction};
use crate::domain::ids::{AssetId, PostId};
use crate::domain::post::Post;
use crate::domain::query::Query;
use crate::domain::route::Route;
use crate::domain::user::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Loading,
    Resolved(String),
    Unavailable,
}

/// 1 回分の解決要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    generation: u64,
    image: AssetId,
}

impl Resolution {
    pub fn image(&self) -> &AssetId {
        &self.image
    }
}

#[derive(Debug, Clone)]
pub struct ImageSlot {
    image: Option<AssetId>,
    state: ImageState,
    generation: u64,
    bound: bool,
    mounted: bool,
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSlot {
    pub fn new() -> Self {
        Self {
            image: None,
            state: ImageState::Loading,
            generation: 0,
            bound: false,
            mounted: true,
        }
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    pub fn image(&self) -> Option<&AssetId> {
        self.image.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// 識別子を設定する。解決が必要なときだけ `Resolution` を返す。
    ///
    /// 同じ識別子を設定し直しても状態は変わらない。
    pub fn set_image(&mut self, image: Option<AssetId>) -> Option<Resolution> {
        let image = image.filter(|id| !id.is_empty());
        if !self.mounted || (self.bound && self.image == image) {
            return None;
        }
        self.bound = true;
        self.generation += 1;
        self.image = image;
        match &self.image {
            Some(id) => {
                self.state = ImageState::Loading;
                Some(Resolution {
                    generation: self.generation,
                    image: id.clone(),
                })
            }
            None => {
                self.state = ImageState::Unavailable;
                None
            }
        }
    }

    /// 解決結果を反映する。古い要求や unmount 後なら何もしないで `false`。
    pub fn complete(&mut self, ticket: Resolution, url: Option<String>) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            debug!(image = %ticket.image, "discarding stale image resolution");
            return false;
        }
        self.state = match url {
            Some(url) => ImageState::Resolved(url),
            None => ImageState::Unavailable,
        };
        true
    }

    /// 取得した URL の読み込みに失敗した
    pub fn image_failed(&mut self) {
        if matches!(self.state, ImageState::Resolved(_)) {
            warn!(image = ?self.image, "image failed to load");
            self.state = ImageState::Unavailable;
        }
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    /// set_image と解決をまとめて行う
    pub async fn load(&mut self, service: &PostService, image: Option<AssetId>) -> &ImageState {
        if let Some(ticket) = self.set_image(image) {
            let url = service.resolve_asset_url(Some(ticket.image())).await;
            self.complete(ticket, url);
        }
        &self.state
    }
}

/// フィードの 1 件
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: PostId,
    pub title: String,
    featured_image: Option<AssetId>,
    image: ImageSlot,
}

impl PostCard {
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            featured_image: post.featured_image.clone(),
            image: ImageSlot::new(),
        }
    }

    pub async fn load_image(&mut self, service: &PostService) -> &ImageState {
        self.image.load(service, self.featured_image.clone()).await
    }

    pub fn image(&self) -> &ImageSlot {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageSlot {
        &mut self.image
    }

    pub fn route(&self) -> Route {
        Route::Post(self.id.clone())
    }

    pub fn path(&self) -> String {
        self.route().path()
    }
}

/// 詳細ページの読み込み結果
#[derive(Debug)]
pub enum PageLoad {
    Ready(PostPage),
    Redirect(Route),
}

#[derive(Debug, Clone)]
pub struct PostPage {
    post: Post,
    image: ImageSlot,
}

impl PostPage {
    /// slug が空、または取得に失敗したらホームへリダイレクト
    pub async fn load(service: &PostService, slug: &str) -> PageLoad {
        if slug.is_empty() {
            return PageLoad::Redirect(Route::Home);
        }
        match service.get_post(&PostId::new(slug)).await {
            Ok(post) => {
                let mut page = PostPage {
                    image: ImageSlot::new(),
                    post,
                };
                page.image
                    .load(service, page.post.featured_image.clone())
                    .await;
                PageLoad::Ready(page)
            }
            Err(_) => PageLoad::Redirect(Route::Home),
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn image(&self) -> &ImageSlot {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageSlot {
        &mut self.image
    }

    /// 編集・削除ボタンを出すかどうか
    pub fn is_author(&self, user: Option<&User>) -> bool {
        user.is_some_and(|u| self.post.is_owned_by(&u.id))
    }

    pub fn edit_route(&self, user: Option<&User>) -> Option<Route> {
        self.is_author(user)
            .then(|| Route::EditPost(self.post.id.clone()))
    }

    /// 作者だけが削除できる。document の削除に成功したときだけ画像も消してホームへ。
    pub async fn delete(&self, service: &PostService, user: Option<&User>) -> Option<Route> {
        if !self.is_author(user) {
            warn!(post_id = %self.post.id, "delete refused: not the author");
            return None;
        }
        if !service.delete_post(&self.post.id).await {
            return None;
        }
        if let Some(image) = &self.post.featured_image {
            service.delete_asset(image).await;
        }
        Some(Route::Home)
    }
}

/// 一覧ページ（ホームと All Posts）
#[derive(Debug, Default)]
pub struct Feed {
    pub cards: Vec<PostCard>,
}

impl Feed {
    /// 一覧を取得して posts container に反映し、カードを作る
    pub async fn load(service: &PostService, state: &mut AppState, queries: &[Query]) -> Feed {
        state.dispatch(PostsAction::SetLoading(true));
        match service.list_posts(queries).await {
            Ok(posts) => {
                let mut cards: Vec<PostCard> = posts.iter().map(PostCard::from_post).collect();
                for card in &mut cards {
                    card.load_image(service).await;
                }
                state.dispatch(PostsAction::SetPosts(posts));
                Feed { cards }
            }
            Err(e) => {
                state.dispatch(PostsAction::SetError(e.to_string()));
                Feed::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::asset::AssetUpload;
    use crate::domain::ids::UserId;
    use crate::domain::post::{PostFields, PostStatus};
    use crate::impls::{BackendCall, InMemoryBackend, Operation};
    use crate::ports::{CollectionRef, SequenceGenerator};

    fn service(backend: &Arc<InMemoryBackend>) -> PostService {
        PostService::new(
            backend.clone(),
            backend.clone(),
            Arc::new(SequenceGenerator::new("img")),
            CollectionRef::new("blog", "posts"),
            "images",
        )
    }

    fn user(id: &str) -> User {
        User {
            id: UserId::new(id),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            created_at: None,
        }
    }

    async fn seed(service: &PostService, id: &str, image: bool) -> Post {
        let featured_image = if image {
            Some(
                service
                    .upload_asset(AssetUpload::new("c.png", "image/png", vec![1u8]))
                    .await
                    .unwrap(),
            )
        } else {
            None
        };
        let fields = PostFields {
            title: id.to_uppercase(),
            content: String::new(),
            featured_image,
            status: PostStatus::Active,
            user_id: UserId::new("u1"),
        };
        service.create_post(&PostId::new(id), &fields).await.unwrap()
    }

    fn resolve_calls(calls: &[BackendCall]) -> usize {
        calls
            .iter()
            .filter(|c| c.operation() == Operation::FileViewUrl)
            .count()
    }

    #[test]
    fn stale_and_unmounted_completions_are_ignored() {
        let mut slot = ImageSlot::new();
        let first = slot.set_image(Some(AssetId::new("a"))).unwrap();
        let second = slot.set_image(Some(AssetId::new("b"))).unwrap();

        assert!(!slot.complete(first, Some("url-a".into())));
        assert_eq!(slot.state(), &ImageState::Loading);

        slot.unmount();
        assert!(!slot.complete(second, Some("url-b".into())));
        assert_eq!(slot.state(), &ImageState::Loading);
    }

    #[test]
    fn same_identifier_does_not_reset() {
        let mut slot = ImageSlot::new();
        let ticket = slot.set_image(Some(AssetId::new("a"))).unwrap();
        slot.complete(ticket, Some("url".into()));

        assert_eq!(slot.set_image(Some(AssetId::new("a"))), None);
        assert_eq!(slot.state(), &ImageState::Resolved("url".into()));

        assert_eq!(slot.set_image(None), None);
        assert_eq!(slot.state(), &ImageState::Unavailable);
    }

    #[test]
    fn empty_identifier_counts_as_no_image() {
        let mut slot = ImageSlot::new();
        assert_eq!(slot.set_image(Some(AssetId::new(""))), None);
        assert_eq!(slot.state(), &ImageState::Unavailable);
        let generation = slot.generation;

        assert_eq!(slot.set_image(Some(AssetId::new(""))), None);
        assert_eq!(slot.set_image(None), None);
        assert_eq!(slot.generation, generation);
        assert_eq!(slot.image(), None);
    }

    #[test]
    fn browser_failure_demotes_resolved_image() {
        let mut slot = ImageSlot::new();
        let ticket = slot.set_image(Some(AssetId::new("a"))).unwrap();
        slot.complete(ticket, Some("url".into()));

        slot.image_failed();
        assert_eq!(slot.state(), &ImageState::Unavailable);
    }

    #[tokio::test]
    async fn no_image_never_calls_resolution() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        let post = seed(&service, "plain", false).await;

        let mut card = PostCard::from_post(&post);
        assert_eq!(card.load_image(&service).await, &ImageState::Unavailable);

        let PageLoad::Ready(page) = PostPage::load(&service, "plain").await else {
            panic!("expected page");
        };
        assert_eq!(page.image().state(), &ImageState::Unavailable);
        assert_eq!(resolve_calls(&backend.calls().await), 0);
    }

    #[tokio::test]
    async fn page_resolves_the_featured_image() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        seed(&service, "pic", true).await;

        let PageLoad::Ready(page) = PostPage::load(&service, "pic").await else {
            panic!("expected page");
        };
        assert_eq!(
            page.image().state(),
            &ImageState::Resolved("memory://images/img-1/view".into())
        );
    }

    #[tokio::test]
    async fn resolution_failure_is_unavailable() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        let post = seed(&service, "pic", true).await;
        backend.fail(Operation::FileViewUrl).await;

        let mut card = PostCard::from_post(&post);
        assert_eq!(card.load_image(&service).await, &ImageState::Unavailable);
    }

    #[tokio::test]
    async fn missing_or_empty_slug_redirects_home() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);

        assert!(matches!(
            PostPage::load(&service, "").await,
            PageLoad::Redirect(Route::Home)
        ));
        assert!(matches!(
            PostPage::load(&service, "nope").await,
            PageLoad::Redirect(Route::Home)
        ));
    }

    #[tokio::test]
    async fn author_controls_are_gated() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        seed(&service, "mine", true).await;
        let PageLoad::Ready(page) = PostPage::load(&service, "mine").await else {
            panic!("expected page");
        };

        assert!(page.is_author(Some(&user("u1"))));
        assert!(!page.is_author(Some(&user("u2"))));
        assert!(!page.is_author(None));
        assert_eq!(
            page.edit_route(Some(&user("u1"))),
            Some(Route::EditPost(PostId::new("mine")))
        );

        backend.clear_calls().await;
        assert_eq!(page.delete(&service, Some(&user("u2"))).await, None);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_asset_only_after_document() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        seed(&service, "mine", true).await;
        let PageLoad::Ready(page) = PostPage::load(&service, "mine").await else {
            panic!("expected page");
        };
        let author = user("u1");

        backend.fail(Operation::DeleteDocument).await;
        backend.clear_calls().await;
        assert_eq!(page.delete(&service, Some(&author)).await, None);
        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(ops, vec![Operation::DeleteDocument]);
        assert!(backend.has_file("images", &AssetId::new("img-1")).await);

        backend.recover(Operation::DeleteDocument).await;
        backend.clear_calls().await;
        assert_eq!(page.delete(&service, Some(&author)).await, Some(Route::Home));
        let ops: Vec<Operation> = backend.calls().await.iter().map(BackendCall::operation).collect();
        assert_eq!(ops, vec![Operation::DeleteDocument, Operation::DeleteFile]);
        assert!(!backend.has_file("images", &AssetId::new("img-1")).await);
    }

    #[tokio::test]
    async fn feed_populates_posts_container() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        seed(&service, "a", true).await;
        seed(&service, "b", false).await;
        let mut state = AppState::new();

        let feed = Feed::load(&service, &mut state, &[]).await;
        assert_eq!(feed.cards.len(), 2);
        assert_eq!(feed.cards[0].path(), "/post/a");
        assert!(matches!(feed.cards[0].image().state(), ImageState::Resolved(_)));
        assert_eq!(feed.cards[1].image().state(), &ImageState::Unavailable);
        assert_eq!(state.posts().posts.len(), 2);
        assert!(!state.posts().loading);
    }

    #[tokio::test]
    async fn feed_failure_is_recorded_in_state() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        backend.fail(Operation::ListDocuments).await;
        let mut state = AppState::new();

        let feed = Feed::load(&service, &mut state, &[]).await;
        assert!(feed.is_empty());
        assert!(state.posts().error.is_some());
        assert!(!state.posts().loading);
    }
}
