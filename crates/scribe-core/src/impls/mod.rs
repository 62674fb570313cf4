//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryBackend**: 開発用・テスト用（呼び出しジャーナルと失敗注入つき）
//! - **HttpBackend**: プラットフォームの REST API を話す本番用クライアント

pub mod http_backend;
pub mod inmem_backend;

// 主要な型を再エクスポート
pub use self::http_backend::HttpBackend;
pub use self::inmem_backend::{BackendCall, InMemoryBackend, Operation};
