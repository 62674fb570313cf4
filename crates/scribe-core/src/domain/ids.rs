//! Domain identifiers (strongly-typed IDs).
//!
//! バックエンドの ID はすべて文字列です（document の `$id`、file の `$id`、
//! account の `$id`）。Post の ID は slug そのもので、人が読める形をしています。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。
//! PostId を AssetId の引数に渡す、といった取り違えはコンパイルエラーになります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// ログで使う種別名（"post", "asset", "user"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    /// ログ・エラーメッセージで使う種別名
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
///
/// wire 上では素の文字列として serialize されます。
///
/// # 例
/// ```ignore
/// let post: PostId = Id::new("hello-world");
/// let asset: AssetId = Id::new("01HZX...");
/// // post と asset は異なる型なので、混同できない
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// バックエンドは空文字の ID を「ID なし」として返すことがある
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", T::kind(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Post のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Post {}

impl IdMarker for Post {
    fn kind() -> &'static str {
        "post"
    }
}

/// Asset（featured image）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {}

impl IdMarker for Asset {
    fn kind() -> &'static str {
        "asset"
    }
}

/// User のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn kind() -> &'static str {
        "user"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Identifier of a post document. Doubles as the URL slug.
pub type PostId = Id<Post>;

/// Identifier of a stored image in the bucket.
pub type AssetId = Id<Asset>;

/// Identifier of an account.
pub type UserId = Id<User>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let post = PostId::new("hello-world");

        let serialized = serde_json::to_string(&post).unwrap();
        assert_eq!(serialized, "\"hello-world\"");

        let deserialized: PostId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, post);
    }

    #[test]
    fn display_is_the_raw_value() {
        let asset = AssetId::new("imgA");
        assert_eq!(asset.to_string(), "imgA");
        assert_eq!(format!("{asset:?}"), "asset(\"imgA\")");

        // let _: PostId = asset; // <- does not compile
    }

    #[test]
    fn empty_ids_are_detectable() {
        assert!(AssetId::new("").is_empty());
        assert!(!AssetId::new("x").is_empty());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<PostId>(), size_of::<String>());
        assert_eq!(size_of::<AssetId>(), size_of::<String>());
    }
}
