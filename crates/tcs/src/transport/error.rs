//! Remote call failures

use std::time::Duration;

/// Fallback when neither a remote detail nor an error message is available
const UNKNOWN_ERROR: &str = "unknown error";

/// How a remote call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The server answered with a non-2xx status
    Status,
    /// The call exceeded its timeout budget
    Timeout,
    /// Connection-level failure (DNS, refused, reset, ...)
    Network,
    /// A 2xx response whose body could not be decoded
    Decode,
}

/// A failed call to the TCS backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
    /// Structured detail from the error payload (`{"detail": ...}`)
    pub detail: Option<String>,
    pub message: String,
}

impl RemoteError {
    /// Build an error from a non-2xx response and its raw body
    pub fn from_response(status: u16, body: &str) -> Self {
        Self {
            kind: RemoteErrorKind::Status,
            status: Some(status),
            detail: parse_detail(body),
            message: format!("Request failed with status code {status}"),
        }
    }

    pub fn timeout(budget: Duration) -> Self {
        Self {
            kind: RemoteErrorKind::Timeout,
            status: None,
            detail: None,
            message: format!("timeout of {}ms exceeded", budget.as_millis()),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Network,
            status: None,
            detail: None,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Decode,
            status: None,
            detail: None,
            message: message.into(),
        }
    }

    /// Most specific description available: remote detail, then our own
    /// message, then a generic fallback
    pub fn error_detail(&self) -> String {
        self.detail
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(self.message.as_str()).filter(|m| !m.trim().is_empty()))
            .unwrap_or(UNKNOWN_ERROR)
            .to_string()
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == RemoteErrorKind::Timeout
    }
}

/// Extract `detail` from an error payload
///
/// String details are used verbatim; structured ones (validation error
/// lists and the like) are kept as compact JSON.
fn parse_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
