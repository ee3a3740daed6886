//! HTTP implementation of the triage backend

use super::types::{
    ApiKeyStatus, Assessment, ChatReply, ChatRequest, DiagnoseRequest, SetApiKeyRequest,
    SetApiKeyResponse,
};
use super::{BackendError, TriageService};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Talks JSON to the triage backend over HTTP
pub struct HttpTriageService {
    client: Client,
    base_url: String,
}

impl HttpTriageService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| BackendError::invalid_response(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl TriageService for HttpTriageService {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        self.post_json("chat", request).await
    }

    async fn diagnose(&self, request: &DiagnoseRequest) -> Result<Assessment, BackendError> {
        self.post_json("diagnose", request).await
    }

    async fn check_api_key(&self) -> Result<ApiKeyStatus, BackendError> {
        self.get_json("check-api-key").await
    }

    async fn set_api_key(
        &self,
        request: &SetApiKeyRequest,
    ) -> Result<SetApiKeyResponse, BackendError> {
        self.post_json("set-api-key", request).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
