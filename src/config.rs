//! Client configuration from the environment

use crate::state_machine::state::{DEFAULT_AUTO_DIAGNOSIS_THRESHOLD, DEFAULT_OFFER_AFTER};
use crate::state_machine::SessionContext;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub offer_after: u32,
    pub auto_diagnosis_threshold: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            offer_after: DEFAULT_OFFER_AFTER,
            auto_diagnosis_threshold: DEFAULT_AUTO_DIAGNOSIS_THRESHOLD,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let backend_url = lookup("CAREPATH_BACKEND_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.backend_url);

        let timeout_secs = parse_or(
            &lookup,
            "CAREPATH_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );

        let threshold = parse_or(
            &lookup,
            "CAREPATH_AUTO_DIAGNOSIS_THRESHOLD",
            defaults.auto_diagnosis_threshold,
        );
        let auto_diagnosis_threshold = if threshold.is_finite() {
            threshold
        } else {
            tracing::warn!(value = threshold, "Ignoring non-finite diagnosis threshold");
            defaults.auto_diagnosis_threshold
        };

        Self {
            backend_url,
            request_timeout: Duration::from_secs(timeout_secs),
            offer_after: parse_or(&lookup, "CAREPATH_OFFER_AFTER", defaults.offer_after),
            auto_diagnosis_threshold,
        }
    }

    /// Context for a new session with a fresh id
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(uuid::Uuid::new_v4().to_string())
            .with_offer_after(self.offer_after)
            .with_auto_diagnosis_threshold(self.auto_diagnosis_threshold)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, ?default, "Invalid value, using default");
            default
        }),
    }
}
