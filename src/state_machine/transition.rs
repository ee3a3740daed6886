//! Pure state transition function

use super::entry;
use super::state::{RequestKind, Session, SessionState};
use super::triggers::{should_auto_diagnose, should_offer_diagnosis};
use super::{Effect, Event, SessionContext};
use crate::backend::ChatRequest;
use crate::transcript::Message;
use thiserror::Error;

/// Shown in the transcript when a chat round-trip fails
pub const CHAT_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Shown in the transcript when the diagnosis request fails
pub const DIAGNOSIS_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while generating the diagnosis.";

/// Appended once an assessment has been received
pub const ASSESSMENT_COMPLETE_MESSAGE: &str =
    "I have completed my assessment based on our conversation.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Append a state-change notice reflecting the new session
    pub fn notify_state(mut self) -> Self {
        let effect = Effect::state_changed(&self.new_session);
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Please select or enter at least one symptom")]
    NoSymptomProvided,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A request is already in flight")]
    Busy,
    #[error("A diagnosis request is already in flight")]
    DiagnosisPending,
    #[error("Diagnosis is not available yet")]
    DiagnosisNotOffered,
    #[error("Assessment already completed")]
    SessionComplete,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Rejections the user should see; the rest are dropped quietly
    pub fn is_user_facing(&self) -> bool {
        matches!(self, TransitionError::NoSymptomProvided)
    }
}

/// Pure transition function
///
/// Given the same inputs, always produces the same outputs, with no I/O.
#[allow(clippy::too_many_lines)]
pub fn transition(
    session: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&session.state, event) {
        // ============================================================
        // Entry mode
        // ============================================================

        // Unstarted + StartChat -> Conversing with greeting
        (SessionState::Unstarted, Event::StartChat) => {
            let next = Session {
                state: SessionState::conversing(),
                transcript: entry::start_chat(),
                pending: session.pending.clone(),
            };
            let appended: Vec<Effect> = next.transcript.iter().map(Effect::message_appended).collect();
            Ok(TransitionResult::new(next)
                .with_effects(appended)
                .notify_state())
        }

        // Unstarted + ChooseSymptoms -> PickingSymptoms
        (SessionState::Unstarted, Event::ChooseSymptoms) => {
            let mut next = session.clone();
            next.state = SessionState::PickingSymptoms {
                selection: entry::SymptomSelection::new(),
            };
            Ok(TransitionResult::new(next).notify_state())
        }

        // PickingSymptoms + Back -> Unstarted, selection discarded
        (SessionState::PickingSymptoms { .. }, Event::Back) => {
            let mut next = session.clone();
            next.state = SessionState::Unstarted;
            Ok(TransitionResult::new(next).notify_state())
        }

        (SessionState::PickingSymptoms { selection }, Event::ToggleSymptom { symptom }) => {
            let symptom = symptom.trim();
            if symptom.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "Cannot toggle a blank symptom".to_string(),
                ));
            }
            let mut selection = selection.clone();
            selection.toggle(symptom);

            let mut next = session.clone();
            next.state = SessionState::PickingSymptoms { selection };
            Ok(TransitionResult::new(next).notify_state())
        }

        (SessionState::PickingSymptoms { selection }, Event::SetCustomText { text }) => {
            let mut selection = selection.clone();
            selection.set_custom_text(text);

            let mut next = session.clone();
            next.state = SessionState::PickingSymptoms { selection };
            Ok(TransitionResult::new(next).notify_state())
        }

        // PickingSymptoms + SubmitSymptoms -> Conversing, first round-trip in flight
        (SessionState::PickingSymptoms { selection }, Event::SubmitSymptoms) => {
            let seeded = entry::start_from_symptoms(selection)?;

            let mut next = Session {
                state: SessionState::conversing(),
                transcript: seeded.transcript,
                pending: session.pending.clone(),
            };
            next.pending.insert(RequestKind::Chat);

            let appended: Vec<Effect> = next.transcript.iter().map(Effect::message_appended).collect();
            Ok(TransitionResult::new(next)
                .with_effects(appended)
                .with_effect(Effect::RequestChat {
                    request: seeded.opening_request,
                })
                .notify_state())
        }

        // ============================================================
        // Conversation
        // ============================================================

        // Conversing + UserMessage -> append, chat in flight
        (SessionState::Conversing { .. }, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if session.is_loading() {
                return Err(TransitionError::Busy);
            }

            let request = ChatRequest {
                message: text.clone(),
                conversation_history: session.transcript.to_history(),
            };
            let message = Message::user(text);

            let mut next = session.clone();
            next.transcript.push(message.clone());
            next.pending.insert(RequestKind::Chat);

            Ok(TransitionResult::new(next)
                .with_effect(Effect::message_appended(&message))
                .with_effect(Effect::RequestChat { request })
                .notify_state())
        }

        (SessionState::Diagnosed { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::SessionComplete)
        }

        // Conversing + ChatCompleted -> exchange counted, triggers evaluated
        (
            SessionState::Conversing {
                exchange_count,
                diagnosis_offered,
            },
            Event::ChatCompleted { reply, confidence },
        ) if session.pending.contains(RequestKind::Chat) => {
            let exchange_count = exchange_count + 1;
            let diagnosis_offered =
                *diagnosis_offered || should_offer_diagnosis(exchange_count, context);
            let auto_diagnose = should_auto_diagnose(confidence, context);

            let reply = Message::assistant(reply);
            let mut next = session.clone();
            next.pending.remove(RequestKind::Chat);
            next.transcript.push(reply.clone());
            next.state = SessionState::Conversing {
                exchange_count,
                diagnosis_offered,
            };

            let mut effects = vec![Effect::message_appended(&reply)];
            if auto_diagnose {
                next.pending.insert(RequestKind::Diagnosis);
                effects.push(Effect::request_diagnosis(next.transcript.to_history()));
            }

            Ok(TransitionResult::new(next)
                .with_effects(effects)
                .notify_state())
        }

        // Conversing + ChatFailed -> error in transcript, count unchanged
        (SessionState::Conversing { .. }, Event::ChatFailed { .. })
            if session.pending.contains(RequestKind::Chat) =>
        {
            let error = Message::assistant(CHAT_ERROR_MESSAGE);
            let mut next = session.clone();
            next.pending.remove(RequestKind::Chat);
            next.transcript.push(error.clone());

            Ok(TransitionResult::new(next)
                .with_effect(Effect::message_appended(&error))
                .notify_state())
        }

        // ============================================================
        // Diagnosis
        // ============================================================

        // Conversing + RequestDiagnosis -> diagnosis in flight, affordance withdrawn
        (
            SessionState::Conversing {
                diagnosis_offered, ..
            },
            Event::RequestDiagnosis,
        ) => {
            if session.pending.contains(RequestKind::Diagnosis) {
                return Err(TransitionError::DiagnosisPending);
            }
            if session.is_loading() {
                return Err(TransitionError::Busy);
            }
            if !*diagnosis_offered {
                return Err(TransitionError::DiagnosisNotOffered);
            }

            let mut next = session.clone();
            next.pending.insert(RequestKind::Diagnosis);

            Ok(TransitionResult::new(next)
                .with_effect(Effect::request_diagnosis(session.transcript.to_history()))
                .notify_state())
        }

        (SessionState::Diagnosed { .. }, Event::RequestDiagnosis) => {
            if session.pending.contains(RequestKind::Diagnosis) {
                Err(TransitionError::DiagnosisPending)
            } else {
                Err(TransitionError::SessionComplete)
            }
        }

        // DiagnosisCompleted -> Diagnosed. From Diagnosed this replaces the
        // stored assessment wholesale.
        (
            SessionState::Conversing { .. } | SessionState::Diagnosed { .. },
            Event::DiagnosisCompleted { assessment },
        ) if session.pending.contains(RequestKind::Diagnosis) => {
            let complete = Message::assistant(ASSESSMENT_COMPLETE_MESSAGE);
            let ready = Effect::assessment_ready(&assessment);

            let mut next = session.clone();
            next.pending.remove(RequestKind::Diagnosis);
            next.transcript.push(complete.clone());
            next.state = SessionState::Diagnosed { assessment };

            Ok(TransitionResult::new(next)
                .with_effect(Effect::message_appended(&complete))
                .with_effect(ready)
                .notify_state())
        }

        // DiagnosisFailed -> error in transcript, state and offer unchanged
        (
            SessionState::Conversing { .. } | SessionState::Diagnosed { .. },
            Event::DiagnosisFailed { .. },
        ) if session.pending.contains(RequestKind::Diagnosis) => {
            let error = Message::assistant(DIAGNOSIS_ERROR_MESSAGE);
            let mut next = session.clone();
            next.pending.remove(RequestKind::Diagnosis);
            next.transcript.push(error.clone());

            Ok(TransitionResult::new(next)
                .with_effect(Effect::message_appended(&error))
                .notify_state())
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {:?}",
            state.name(),
            event
        ))),
    }
}
