//! scribe-core
//!
//! Core building blocks for the Scribe blog client.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, post, user, asset, document, query, route, slug, errors）
//! - **ports**: 抽象化レイヤー（AccountApi, DocumentsApi, StorageApi, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, post_service, auth_service, authoring, view, store）
//! - **impls**: 実装（HttpBackend と開発用の InMemoryBackend）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
