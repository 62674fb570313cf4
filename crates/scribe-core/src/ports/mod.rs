//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 外部プラットフォーム（認証・document store・ファイルストレージ）への
//! インターフェースを 3 つの capability に分けて提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 同じ REST 面を話せる HTTP クライアントなら何でも差し替え可能
//! - テストでは InMemoryBackend（impls）を使う

pub mod account;
pub mod clock;
pub mod documents;
pub mod id_generator;
pub mod storage;

// 主要な trait を再エクスポート
pub use self::account::AccountApi;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::documents::{CollectionRef, DocumentsApi};
pub use self::id_generator::{IdGenerator, SequenceGenerator, UlidGenerator};
pub use self::storage::StorageApi;

/// Backend は 3 つの capability をすべて持つクライアント
pub trait Backend: AccountApi + DocumentsApi + StorageApi {}

impl<T: AccountApi + DocumentsApi + StorageApi> Backend for T {}
