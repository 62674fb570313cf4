//! Document - document store の汎用レコード
//!
//! ports は document を型なしの JSON として扱い、
//! `Post` などへの変換は app 層（service）が行います。

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::BackendError;

/// Document は `$id` とメタ情報、任意の attribute を持つ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "$updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            updated_at: None,
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// document を型付きの値に変換
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        let value = serde_json::to_value(self)?;
        serde_json::from_value(value).map_err(|e| {
            BackendError::decode(format!("document {}: {e}", self.id)).with_source(e)
        })
    }
}

/// list_documents の結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

/// Serialize 可能な値を attribute の Map に変換
///
/// object 以外に serialize される値は Decode エラーになります。
pub fn to_attributes<T: Serialize>(value: &T) -> Result<Map<String, Value>, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::decode(format!(
            "expected a JSON object for document attributes, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meta_fields_are_split_from_attributes() {
        let doc: Document = serde_json::from_value(json!({
            "$id": "a",
            "$createdAt": "2024-01-01T00:00:00.000+00:00",
            "title": "T"
        }))
        .unwrap();

        assert_eq!(doc.id, "a");
        assert!(doc.created_at.is_some());
        assert_eq!(doc.attribute("title"), Some(&json!("T")));
        assert!(doc.attribute("$id").is_none());
    }

    #[test]
    fn to_attributes_rejects_non_objects() {
        assert!(to_attributes(&json!({"a": 1})).is_ok());
        assert!(to_attributes(&json!([1, 2])).is_err());
    }
}
