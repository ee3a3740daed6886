//! Wire types for the triage backend

use crate::transcript::Message;
use crate::urgency::{classify, Tier};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `POST /chat` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<Message>,
}

/// `POST /chat` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Percentage scale; absent when the backend has no confident match
    #[serde(default, deserialize_with = "deserialize_confidence")]
    pub confidence: Option<f64>,
}

#[cfg(test)]
impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// `POST /diagnose` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnoseRequest {
    pub conversation_history: Vec<Message>,
}

/// Structured result of a diagnosis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "possible_condition")]
    pub condition: String,
    pub category: String,
    /// Percentage-like string, e.g. `"72.5%"`
    pub confidence: String,
    #[serde(rename = "recommended_specialist")]
    pub specialist: String,
    pub urgency_level: String,
    pub action: String,
    #[serde(rename = "emergency", default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub other_possibilities: Vec<String>,
}

impl Assessment {
    pub fn tier(&self) -> Tier {
        classify(&self.urgency_level)
    }
}

/// `GET /check-api-key` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ApiKeyStatus {
    pub has_api_key: bool,
}

/// `POST /set-api-key` body
#[derive(Debug, Clone, Serialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// `POST /set-api-key` response
#[derive(Debug, Clone, Deserialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Accepts a number, a numeric string (optionally with `%`), or null.
/// Anything else is treated as no confidence.
pub fn parse_confidence(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_confidence))
}
