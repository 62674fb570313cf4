//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **AuthService**: account / session のファサード
//! - **PostService**: posts collection と画像バケットのファサード
//! - **PostForm**: 作成・編集フォームと submit の流れ
//! - **ImageSlot / PostCard / PostPage / Feed**: 画面ごとの状態
//! - **AppState**: reducer で更新されるクライアント状態

pub mod auth_service;
pub mod authoring;
pub mod builder;
pub mod post_service;
pub mod store;
pub mod view;

// 主要な型を再エクスポート
pub use self::auth_service::AuthService;
pub use self::authoring::{PostForm, SubmitError};
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::post_service::PostService;
pub use self::store::{Action, AppState, AuthAction, AuthState, AuthStatus, PostsAction, PostsState};
pub use self::view::{Feed, ImageSlot, ImageState, PageLoad, PostCard, PostPage, Resolution};
