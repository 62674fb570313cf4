//! Errors - バックエンド呼び出しのエラー型と分類
//!
//! 外部プラットフォームの失敗はすべて `BackendError` に集約されます。
//! 呼び出し側は `kind()` で分岐し、メッセージはログにそのまま残します。

use thiserror::Error;

/// ErrorKind は失敗の分類
///
/// # 分類
/// - NotFound: document / file / account が存在しない
/// - Conflict: 同じ ID の document / file がすでに存在する
/// - Unauthorized: session がない、または権限が足りない
/// - Rejected: その他 4xx（入力不正など）
/// - Transport: 接続失敗・タイムアウト・5xx
/// - Decode: レスポンスを期待する形に読めなかった
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    Rejected,
    Transport,
    Decode,
}

impl ErrorKind {
    /// HTTP ステータスから分類を決める
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            400..=499 => ErrorKind::Rejected,
            _ => ErrorKind::Transport,
        }
    }
}

/// BackendError は外部プラットフォーム呼び出しの失敗
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct BackendError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// HTTP レスポンスのステータスとメッセージから作成
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorKind::from_status(status), message)
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::decode(format!("json: {e}")).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, ErrorKind::Unauthorized)]
    #[case(403, ErrorKind::Unauthorized)]
    #[case(404, ErrorKind::NotFound)]
    #[case(409, ErrorKind::Conflict)]
    #[case(400, ErrorKind::Rejected)]
    #[case(500, ErrorKind::Transport)]
    #[case(503, ErrorKind::Transport)]
    fn status_codes_are_classified(#[case] status: u16, #[case] kind: ErrorKind) {
        let err = BackendError::http_status(status, "boom");
        assert_eq!(err.kind(), kind);
        assert_eq!(err.status(), Some(status));
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = BackendError::not_found("Document with the requested ID could not be found.");
        assert_eq!(
            err.to_string(),
            "NotFound: Document with the requested ID could not be found."
        );
    }
}
