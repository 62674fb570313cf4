//! Post record and the document shapes written to the posts collection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::errors::BackendError;
use super::ids::{AssetId, PostId, UserId};

/// Publication status of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Inactive,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post status '{0}' (expected 'active' or 'inactive')")]
pub struct ParseStatusError(String);

impl FromStr for PostStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PostStatus::Active),
            "inactive" => Ok(PostStatus::Inactive),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A post as read back from the backend.
///
/// `featured_image` は空文字でも `None` に正規化される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "$id")]
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "featuredImage", default)]
    pub featured_image: Option<AssetId>,
    #[serde(rename = "$createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "$updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn from_document(document: &Document) -> Result<Self, BackendError> {
        let mut post: Post = document.decode()?;
        if post.featured_image.as_ref().is_some_and(AssetId::is_empty) {
            post.featured_image = None;
        }
        Ok(post)
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

/// Attributes written when a post document is created.
///
/// Shape on the wire: `{ title, content, featuredImage, status, userId }`.
/// `featuredImage` is always present, `null` when the post has no image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub featured_image: Option<AssetId>,
    pub status: PostStatus,
    pub user_id: UserId,
}

/// Partial update. Only `Some` attributes are sent.
///
/// `featured_image: Some(None)` は明示的な `null` を書き込む。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<Option<AssetId>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.status.is_none()
            && self.featured_image.is_none()
    }
}
