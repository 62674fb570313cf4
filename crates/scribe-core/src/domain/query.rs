//! Query - list_documents に渡すフィルタ・並び順・ページング
//!
//! プラットフォームの JSON 形式そのまま:
//! `{"method":"equal","attribute":"status","values":["active"]}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryMethod {
    Equal,
    NotEqual,
    OrderAsc,
    OrderDesc,
    Limit,
    Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub method: QueryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            method: QueryMethod::Equal,
            attribute: Some(attribute.into()),
            values: vec![value.into()],
        }
    }

    pub fn not_equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            method: QueryMethod::NotEqual,
            attribute: Some(attribute.into()),
            values: vec![value.into()],
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self {
            method: QueryMethod::OrderAsc,
            attribute: Some(attribute.into()),
            values: Vec::new(),
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self {
            method: QueryMethod::OrderDesc,
            attribute: Some(attribute.into()),
            values: Vec::new(),
        }
    }

    pub fn limit(n: u64) -> Self {
        Self {
            method: QueryMethod::Limit,
            attribute: None,
            values: vec![Value::from(n)],
        }
    }

    pub fn offset(n: u64) -> Self {
        Self {
            method: QueryMethod::Offset,
            attribute: None,
            values: vec![Value::from(n)],
        }
    }

    /// `queries[]` パラメータに載せる文字列表現
    pub fn to_param(&self) -> String {
        // Query は常に object に serialize できる
        serde_json::to_string(self).unwrap_or_default()
    }

    /// limit / offset の数値
    pub fn count(&self) -> Option<u64> {
        self.values.first().and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_uses_platform_shape() {
        let q = Query::equal("status", "active");
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"method": "equal", "attribute": "status", "values": ["active"]})
        );
    }

    #[test]
    fn paging_queries_have_no_attribute() {
        assert_eq!(Query::limit(25).to_param(), r#"{"method":"limit","values":[25]}"#);
        assert_eq!(Query::offset(5).count(), Some(5));
        assert_eq!(
            Query::order_desc("$createdAt").to_param(),
            r#"{"method":"orderDesc","attribute":"$createdAt"}"#
        );
    }
}
