//! Triage backend abstraction
//!
//! The chat/diagnosis service is an external collaborator; everything the
//! session needs from it goes through [`TriageService`].

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpTriageService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for triage backends
#[async_trait]
pub trait TriageService: Send + Sync {
    /// One conversational round-trip
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    /// Terminal diagnosis over the whole transcript
    async fn diagnose(&self, request: &DiagnoseRequest) -> Result<Assessment, BackendError>;

    /// Whether the backend has model credentials configured
    async fn check_api_key(&self) -> Result<ApiKeyStatus, BackendError>;

    /// Install model credentials on the backend
    async fn set_api_key(
        &self,
        request: &SetApiKeyRequest,
    ) -> Result<SetApiKeyResponse, BackendError>;

    fn base_url(&self) -> &str;
}

#[async_trait]
impl<T: TriageService + ?Sized> TriageService for Arc<T> {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        (**self).chat(request).await
    }

    async fn diagnose(&self, request: &DiagnoseRequest) -> Result<Assessment, BackendError> {
        (**self).diagnose(request).await
    }

    async fn check_api_key(&self) -> Result<ApiKeyStatus, BackendError> {
        (**self).check_api_key().await
    }

    async fn set_api_key(
        &self,
        request: &SetApiKeyRequest,
    ) -> Result<SetApiKeyResponse, BackendError> {
        (**self).set_api_key(request).await
    }

    fn base_url(&self) -> &str {
        (**self).base_url()
    }
}

/// Logging wrapper for triage services
pub struct LoggingService<S> {
    inner: S,
}

impl<S: TriageService> LoggingService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    fn log_outcome<T>(
        &self,
        call: &'static str,
        start: std::time::Instant,
        result: &Result<T, BackendError>,
    ) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    call,
                    backend = %self.inner.base_url(),
                    duration_ms = %duration.as_millis(),
                    "Backend request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    call,
                    backend = %self.inner.base_url(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "Backend request failed"
                );
            }
        }
    }
}

#[async_trait]
impl<S: TriageService> TriageService for LoggingService<S> {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.chat(request).await;
        self.log_outcome("chat", start, &result);
        if let Ok(reply) = &result {
            tracing::debug!(
                history_len = request.conversation_history.len(),
                confidence = ?reply.confidence,
                "Chat reply received"
            );
        }
        result
    }

    async fn diagnose(&self, request: &DiagnoseRequest) -> Result<Assessment, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.diagnose(request).await;
        self.log_outcome("diagnose", start, &result);
        result
    }

    async fn check_api_key(&self) -> Result<ApiKeyStatus, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.check_api_key().await;
        self.log_outcome("check_api_key", start, &result);
        result
    }

    async fn set_api_key(
        &self,
        request: &SetApiKeyRequest,
    ) -> Result<SetApiKeyResponse, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.set_api_key(request).await;
        self.log_outcome("set_api_key", start, &result);
        result
    }

    fn base_url(&self) -> &str {
        self.inner.base_url()
    }
}
