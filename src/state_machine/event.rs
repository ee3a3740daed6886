//! Events that can occur in a session

use crate::backend::{Assessment, BackendErrorKind};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Entry events
    StartChat,
    ChooseSymptoms,
    Back,
    ToggleSymptom {
        symptom: String,
    },
    SetCustomText {
        text: String,
    },
    SubmitSymptoms,

    // Conversation events
    UserMessage {
        text: String,
    },
    ChatCompleted {
        reply: String,
        /// Percentage scale, if the backend reported one
        confidence: Option<f64>,
    },
    ChatFailed {
        message: String,
        kind: BackendErrorKind,
    },

    // Diagnosis events
    RequestDiagnosis,
    DiagnosisCompleted {
        assessment: Assessment,
    },
    DiagnosisFailed {
        message: String,
        kind: BackendErrorKind,
    },
}

impl Event {
    /// Completions reported by background requests rather than the user
    pub fn is_network_completion(&self) -> bool {
        matches!(
            self,
            Event::ChatCompleted { .. }
                | Event::ChatFailed { .. }
                | Event::DiagnosisCompleted { .. }
                | Event::DiagnosisFailed { .. }
        )
    }
}

#[cfg(test)]
impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }

    pub fn toggle_symptom(symptom: impl Into<String>) -> Self {
        Event::ToggleSymptom {
            symptom: symptom.into(),
        }
    }

    pub fn set_custom_text(text: impl Into<String>) -> Self {
        Event::SetCustomText { text: text.into() }
    }
}
