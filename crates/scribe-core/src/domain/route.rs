//! Route - 画面遷移先
//!
//! workflow や view は遷移を直接行わず、遷移先を `Route` として返します。

use std::fmt;

use super::ids::PostId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    AllPosts,
    AddPost,
    Post(PostId),
    EditPost(PostId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::AllPosts => "/all-posts".to_string(),
            Route::AddPost => "/add-post".to_string(),
            Route::Post(id) => format!("/post/{id}"),
            Route::EditPost(id) => format!("/edit-post/{id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
