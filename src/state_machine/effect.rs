//! Effects produced by state transitions

use super::state::Session;
use crate::backend::{Assessment, ChatRequest, DiagnoseRequest};
use crate::runtime::SessionUpdate;
use crate::transcript::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send one chat round-trip (spawns as background task)
    RequestChat { request: ChatRequest },

    /// Send the terminal diagnosis request (spawns as background task)
    RequestDiagnosis { request: DiagnoseRequest },

    /// Notify subscribers
    Notify { update: SessionUpdate },
}

impl Effect {
    pub fn message_appended(message: &Message) -> Self {
        Effect::Notify {
            update: SessionUpdate::MessageAppended {
                message: message.clone(),
            },
        }
    }

    pub fn state_changed(session: &Session) -> Self {
        Effect::Notify {
            update: SessionUpdate::StateChanged {
                state: session.state.clone(),
                loading: session.is_loading(),
                diagnosis_available: session.diagnosis_available(),
            },
        }
    }

    pub fn assessment_ready(assessment: &Assessment) -> Self {
        Effect::Notify {
            update: SessionUpdate::AssessmentReady {
                assessment: assessment.clone(),
                tier: assessment.tier(),
            },
        }
    }

    pub fn request_diagnosis(history: Vec<Message>) -> Self {
        Effect::RequestDiagnosis {
            request: DiagnoseRequest {
                conversation_history: history,
            },
        }
    }
}
