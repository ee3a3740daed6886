//! Credential gate run before a session starts
//!
//! The backend needs model credentials before it can answer. On start we ask
//! it whether a key is installed and, if not, prompt for one and hand it over.

use crate::backend::{BackendError, SetApiKeyRequest, TriageService};
use crate::repl::LineSource;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const KEY_PREFIX: &str = "sk-";
const KEY_PROMPT: &str = "API key (sk-...): ";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Please enter an API key")]
    MissingKey,
    #[error("Invalid API key format. OpenAI API keys start with \"sk-\"")]
    InvalidKeyFormat,
    #[error("Failed to save API key")]
    SaveFailed { message: Option<String> },
    #[error("Error connecting to server. Make sure the backend is running.")]
    Unreachable(#[source] BackendError),
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),
    #[error("No API key entered")]
    Aborted,
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for ConfigurationError {
    fn from(error: BackendError) -> Self {
        if error.kind.is_unreachable() {
            ConfigurationError::Unreachable(error)
        } else {
            ConfigurationError::Backend(error)
        }
    }
}

impl ConfigurationError {
    /// Whether the user can fix this by typing a different key
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConfigurationError::MissingKey
                | ConfigurationError::InvalidKeyFormat
                | ConfigurationError::SaveFailed { .. }
                | ConfigurationError::Unreachable(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Ready,
    KeyRequired,
}

pub async fn check_credentials<S>(service: &S) -> Result<CredentialStatus, ConfigurationError>
where
    S: TriageService + ?Sized,
{
    let status = service.check_api_key().await?;
    Ok(if status.has_api_key {
        CredentialStatus::Ready
    } else {
        CredentialStatus::KeyRequired
    })
}

/// Local format check; returns the key with surrounding whitespace removed.
pub fn validate_api_key(input: &str) -> Result<&str, ConfigurationError> {
    let key = input.trim();
    if key.is_empty() {
        return Err(ConfigurationError::MissingKey);
    }
    if !key.starts_with(KEY_PREFIX) {
        return Err(ConfigurationError::InvalidKeyFormat);
    }
    Ok(key)
}

pub async fn install_api_key<S>(service: &S, input: &str) -> Result<(), ConfigurationError>
where
    S: TriageService + ?Sized,
{
    let key = validate_api_key(input)?;
    let response = service
        .set_api_key(&SetApiKeyRequest {
            api_key: key.to_string(),
        })
        .await?;

    if response.success {
        tracing::info!("API key installed");
        Ok(())
    } else {
        tracing::warn!(message = ?response.message, "Backend refused API key");
        Err(ConfigurationError::SaveFailed {
            message: response.message,
        })
    }
}

/// Block until the backend has a key, prompting on `input` as needed.
///
/// An unreachable backend is reported as a banner and the prompt is shown
/// anyway, so the user can start the backend and retry.
pub async fn ensure_credentials<S, L, W>(
    service: &S,
    input: &mut L,
    output: &mut W,
) -> Result<(), ConfigurationError>
where
    S: TriageService + ?Sized,
    L: LineSource + ?Sized,
    W: AsyncWrite + Unpin,
{
    match check_credentials(service).await {
        Ok(CredentialStatus::Ready) => return Ok(()),
        Ok(CredentialStatus::KeyRequired) => {}
        Err(e @ ConfigurationError::Unreachable(_)) => {
            tracing::warn!(url = service.base_url(), "Could not check API key");
            banner(output, &e.to_string()).await?;
        }
        Err(e) => return Err(e),
    }

    output
        .write_all(b"OpenAI API Key Required\nEnter your OpenAI API key to start using CarePath\n")
        .await?;

    loop {
        output.flush().await?;

        let Some(line) = input.next_line(KEY_PROMPT).await? else {
            return Err(ConfigurationError::Aborted);
        };

        match install_api_key(service, &line).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() => banner(output, &e.to_string()).await?,
            Err(e) => return Err(e),
        }
    }
}

async fn banner<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(format!("! {text}\n").as_bytes()).await
}
