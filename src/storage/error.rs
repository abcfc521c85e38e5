use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error document returned by ArangoDB alongside a non-success status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: bool,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_num: Option<i64>,
    #[serde(default)]
    pub error_message: String,
}

impl ErrorBody {
    pub fn new(code: u16, error_num: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            code,
            error_num,
            error_message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found: {}", .0.error_message)]
    NotFound(ErrorBody),
    #[error("conflict: {}", .0.error_message)]
    Conflict(ErrorBody),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store answered {}: {}", .0.code, .0.error_message)]
    Unknown(ErrorBody),
    #[error("invalid store url {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Classify a non-success store response. Bodies that are not ArangoDB
    /// error documents are kept as the message.
    pub fn from_response(status: StatusCode, raw: &str) -> Self {
        let body = serde_json::from_str::<ErrorBody>(raw).unwrap_or_else(|_| {
            let message = if raw.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                raw.to_string()
            };
            ErrorBody::new(status.as_u16(), None, message)
        });

        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(body),
            StatusCode::CONFLICT => StoreError::Conflict(body),
            _ => StoreError::Unknown(body),
        }
    }

    /// The structured store error, if the store answered at all
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            StoreError::NotFound(body) | StoreError::Conflict(body) | StoreError::Unknown(body) => Some(body),
            StoreError::Transport(_) | StoreError::InvalidUrl(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn parses_arango_error_documents() {
        let raw = r#"{"error":true,"errorMessage":"unique constraint violated","code":409,"errorNum":1210}"#;

        let error = StoreError::from_response(StatusCode::CONFLICT, raw);

        assert!(matches!(error, StoreError::Conflict(_)));
        assert_eq!(
            error.body(),
            Some(&ErrorBody::new(409, Some(1210), "unique constraint violated"))
        );
    }

    #[rstest]
    #[case(StatusCode::NOT_FOUND, "")]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, "<html>proxy error</html>")]
    #[case(StatusCode::UNAUTHORIZED, "")]
    fn synthesizes_a_body_for_foreign_responses(#[case] status: StatusCode, #[case] raw: &str) {
        let error = StoreError::from_response(status, raw);

        let body = error.body().cloned();
        assert_eq!(body.as_ref().map(|b| b.code), Some(status.as_u16()));
        assert!(body.is_some_and(|b| !b.error_message.is_empty()));
    }

    #[test]
    fn unmapped_statuses_are_unknown() {
        let error = StoreError::from_response(StatusCode::BAD_REQUEST, r#"{"error":true,"code":400,"errorNum":600,"errorMessage":"invalid JSON"}"#);

        assert!(matches!(error, StoreError::Unknown(ref body) if body.error_num == Some(600)));
    }
}
