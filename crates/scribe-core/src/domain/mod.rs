//! Domain model (IDs, posts, accounts, assets, queries, routes, errors).
//!
//! ここにある型は外部プラットフォームにも UI にも依存しません。

pub mod asset;
pub mod document;
pub mod errors;
pub mod ids;
pub mod post;
pub mod query;
pub mod route;
pub mod slug;
pub mod user;

pub use self::asset::{ACCEPTED_EXTENSIONS, AssetError, AssetUpload, StoredFile};
pub use self::document::{Document, DocumentList};
pub use self::errors::{BackendError, ErrorKind};
pub use self::ids::{AssetId, Id, IdMarker, PostId, UserId};
pub use self::post::{ParseStatusError, Post, PostFields, PostPatch, PostStatus};
pub use self::query::{Query, QueryMethod};
pub use self::route::Route;
pub use self::slug::slugify;
pub use self::user::{Credentials, NewAccount, Session, User};
