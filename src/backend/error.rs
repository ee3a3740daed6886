//! Backend error types

use thiserror::Error;

/// Failed chat, diagnosis, or credential call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            400..=499 => Self::invalid_request(format!("Request rejected ({status}): {detail}")),
            500..=599 => Self::server_error(format!("Server error ({status}): {detail}")),
            _ => Self::unknown(format!("Unexpected status {status}: {detail}")),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection refused, DNS, timeouts
    Network,
    /// 5xx from the backend
    ServerError,
    /// 4xx from the backend
    InvalidRequest,
    /// Body could not be decoded
    InvalidResponse,
    Unknown,
}

impl BackendErrorKind {
    /// The backend could not be reached at all
    pub fn is_unreachable(self) -> bool {
        matches!(self, Self::Network)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::ServerError => "server_error",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidResponse => "invalid_response",
            Self::Unknown => "unknown",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::invalid_response(format!("Malformed response: {e}"))
        } else if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::network(format!("Network error: {e}"))
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), &e.to_string())
        } else {
            Self::unknown(e.to_string())
        }
    }
}

/// FastAPI-style `{"detail": "..."}` bodies carry the useful part
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
