//! Session state types

use super::entry::SymptomSelection;
use crate::backend::Assessment;
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Session State
// ============================================================================

/// Where the session is in its lifecycle.
///
/// Advances monotonically; the only backward step is `Back` from
/// `PickingSymptoms` to `Unstarted`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// No entry mode chosen yet
    #[default]
    Unstarted,

    /// Building a symptom list before the first network call
    PickingSymptoms { selection: SymptomSelection },

    /// Free conversation with the backend
    Conversing {
        /// Completed exchanges (user message + assistant reply)
        exchange_count: u32,
        /// Sticky once set; the manual diagnosis action is exposed
        diagnosis_offered: bool,
    },

    /// Assessment received, conversation closed
    Diagnosed { assessment: Assessment },
}

impl SessionState {
    pub fn conversing() -> Self {
        SessionState::Conversing {
            exchange_count: 0,
            diagnosis_offered: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unstarted => "unstarted",
            SessionState::PickingSymptoms { .. } => "picking_symptoms",
            SessionState::Conversing { .. } => "conversing",
            SessionState::Diagnosed { .. } => "diagnosed",
        }
    }

    #[cfg(test)]
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            SessionState::Diagnosed { assessment } => Some(assessment),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn exchange_count(&self) -> Option<u32> {
        match self {
            SessionState::Conversing { exchange_count, .. } => Some(*exchange_count),
            _ => None,
        }
    }

    pub fn diagnosis_offered(&self) -> bool {
        matches!(
            self,
            SessionState::Conversing {
                diagnosis_offered: true,
                ..
            }
        )
    }
}

// ============================================================================
// Pending request guard
// ============================================================================

/// Kind of outbound request a session can have in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Chat,
    Diagnosis,
}

/// Requests currently in flight. Checked before issuing any new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingRequests {
    kinds: BTreeSet<RequestKind>,
}

impl PendingRequests {
    pub fn contains(&self, kind: RequestKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns false if a request of this kind was already pending
    pub fn insert(&mut self, kind: RequestKind) -> bool {
        self.kinds.insert(kind)
    }

    pub fn remove(&mut self, kind: RequestKind) -> bool {
        self.kinds.remove(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

// ============================================================================
// Session aggregate
// ============================================================================

/// Everything one session owns: lifecycle state, transcript, in-flight guard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: SessionState,
    pub transcript: Transcript,
    pub pending: PendingRequests,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input must be disabled while anything is in flight
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Free-text input is accepted
    #[cfg(test)]
    pub fn accepts_input(&self) -> bool {
        matches!(self.state, SessionState::Conversing { .. }) && !self.is_loading()
    }

    /// The "ready for diagnosis" action is shown and enabled
    pub fn diagnosis_available(&self) -> bool {
        self.state.diagnosis_offered() && !self.is_loading()
    }
}

// ============================================================================
// Context
// ============================================================================

/// Exchanges after which the manual diagnosis action is offered
pub const DEFAULT_OFFER_AFTER: u32 = 3;

/// Chat confidence (percent) at which diagnosis starts automatically
pub const DEFAULT_AUTO_DIAGNOSIS_THRESHOLD: f64 = 90.0;

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub offer_after: u32,
    pub auto_diagnosis_threshold: f64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            offer_after: DEFAULT_OFFER_AFTER,
            auto_diagnosis_threshold: DEFAULT_AUTO_DIAGNOSIS_THRESHOLD,
        }
    }

    pub fn with_offer_after(mut self, exchanges: u32) -> Self {
        self.offer_after = exchanges;
        self
    }

    pub fn with_auto_diagnosis_threshold(mut self, threshold: f64) -> Self {
        self.auto_diagnosis_threshold = threshold;
        self
    }
}
