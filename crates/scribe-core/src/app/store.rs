//! State containers - reducer で更新されるクライアント側の状態
//!
//! グローバルなシングルトンは持たず、`AppState` を明示的に受け渡します。
//! 状態を変更できるのは `dispatch` だけで、1 回に 1 つの action を処理します。

use crate::domain::ids::PostId;
use crate::domain::post::Post;
use crate::domain::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    SignedOut,
    SignedIn,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub status: AuthStatus,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Login(User),
    Logout,
}

impl AuthState {
    pub fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::Login(user) => {
                self.status = AuthStatus::SignedIn;
                self.user = Some(user);
            }
            AuthAction::Logout => {
                self.status = AuthStatus::SignedOut;
                self.user = None;
            }
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.status == AuthStatus::SignedIn
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    pub posts: Vec<Post>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostsAction {
    SetPosts(Vec<Post>),
    AddPost(Post),
    RemovePost(PostId),
    SetLoading(bool),
    SetError(String),
}

impl PostsState {
    pub fn reduce(&mut self, action: PostsAction) {
        match action {
            PostsAction::SetPosts(posts) => {
                self.posts = posts;
                self.loading = false;
                self.error = None;
            }
            PostsAction::AddPost(post) => self.posts.push(post),
            PostsAction::RemovePost(id) => self.posts.retain(|p| p.id != id),
            PostsAction::SetLoading(loading) => self.loading = loading,
            PostsAction::SetError(message) => {
                self.error = Some(message);
                self.loading = false;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Auth(AuthAction),
    Posts(PostsAction),
}

impl From<AuthAction> for Action {
    fn from(action: AuthAction) -> Self {
        Action::Auth(action)
    }
}

impl From<PostsAction> for Action {
    fn from(action: PostsAction) -> Self {
        Action::Posts(action)
    }
}

/// AppState はアプリ全体の状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    auth: AuthState,
    posts: PostsState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: impl Into<Action>) {
        match action.into() {
            Action::Auth(action) => self.auth.reduce(action),
            Action::Posts(action) => self.posts.reduce(action),
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn posts(&self) -> &PostsState {
        &self.posts
    }

    pub fn current_user(&self) -> Option<&User> {
        self.auth.user.as_ref()
    }
}
