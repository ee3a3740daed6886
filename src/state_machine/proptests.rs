//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::entry::{symptom_message, COMMON_SYMPTOMS};
use super::state::*;
use super::transition::*;
use super::*;
use crate::backend::{Assessment, BackendErrorKind};
use crate::transcript::Role;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("test-session")
}

fn conversing_session() -> Session {
    transition(&Session::new(), &test_context(), Event::StartChat)
        .unwrap()
        .new_session
}

/// Structural invariants that must hold for every reachable session
fn is_valid_session(session: &Session) -> bool {
    let greeting_first = session
        .transcript
        .first()
        .map_or(true, |m| m.role == Role::Assistant);

    let transcript_matches_state = match &session.state {
        SessionState::Unstarted | SessionState::PickingSymptoms { .. } => {
            session.transcript.is_empty()
        }
        SessionState::Conversing { .. } | SessionState::Diagnosed { .. } => {
            !session.transcript.is_empty()
        }
    };

    // Requests only fly once a conversation exists, and never both at once
    let pending_consistent = match &session.state {
        SessionState::Unstarted | SessionState::PickingSymptoms { .. } => {
            session.pending.is_empty()
        }
        SessionState::Conversing { .. } | SessionState::Diagnosed { .. } => {
            !(session.pending.contains(RequestKind::Chat)
                && session.pending.contains(RequestKind::Diagnosis))
        }
    };

    greeting_first && transcript_matches_state && pending_consistent
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_symptom() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(COMMON_SYMPTOMS.to_vec()).prop_map(String::from),
        "[a-z]{3,12}",
    ]
}

fn arb_error_kind() -> impl Strategy<Value = BackendErrorKind> {
    prop_oneof![
        Just(BackendErrorKind::Network),
        Just(BackendErrorKind::ServerError),
        Just(BackendErrorKind::InvalidRequest),
        Just(BackendErrorKind::InvalidResponse),
        Just(BackendErrorKind::Unknown),
    ]
}

fn arb_confidence() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        3 => Just(None),
        1 => (0.0f64..100.0).prop_map(Some),
    ]
}

fn arb_assessment() -> impl Strategy<Value = Assessment> {
    (
        "[A-Z][a-z]{3,12}",
        prop_oneof![
            Just("Emergency".to_string()),
            Just("Urgent Care".to_string()),
            Just("Normal".to_string()),
        ],
        any::<bool>(),
    )
        .prop_map(|(condition, urgency_level, is_emergency)| Assessment {
            condition,
            category: "General".to_string(),
            confidence: "50.0%".to_string(),
            specialist: "General Practitioner".to_string(),
            urgency_level,
            action: "Consult a doctor".to_string(),
            is_emergency,
            other_possibilities: vec![],
        })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::StartChat),
        Just(Event::ChooseSymptoms),
        Just(Event::Back),
        arb_symptom().prop_map(|symptom| Event::ToggleSymptom { symptom }),
        "[a-z ]{0,12}".prop_map(|text| Event::SetCustomText { text }),
        Just(Event::SubmitSymptoms),
        "[a-zA-Z ]{0,20}".prop_map(|text| Event::UserMessage { text }),
        ("[a-zA-Z ]{1,30}", arb_confidence())
            .prop_map(|(reply, confidence)| Event::ChatCompleted { reply, confidence }),
        ("[a-z ]{1,20}", arb_error_kind())
            .prop_map(|(message, kind)| Event::ChatFailed { message, kind }),
        Just(Event::RequestDiagnosis),
        arb_assessment().prop_map(|assessment| Event::DiagnosisCompleted { assessment }),
        ("[a-z ]{1,20}", arb_error_kind())
            .prop_map(|(message, kind)| Event::DiagnosisFailed { message, kind }),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: Valid session after any transition; rejected events change nothing
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut session = Session::new();
        let ctx = test_context();

        for event in events {
            match transition(&session, &ctx, event) {
                Ok(result) => {
                    session = result.new_session;
                    prop_assert!(is_valid_session(&session), "Invalid session: {:?}", session);
                }
                Err(_) => { /* Rejected event leaves the session untouched */ }
            }
        }
    }

    // Invariant 2: Transcript is append-only
    #[test]
    fn prop_transcript_append_only(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut session = Session::new();
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                let before = session.transcript.messages();
                let after = result.new_session.transcript.messages();
                prop_assert!(after.len() >= before.len());
                prop_assert_eq!(&after[..before.len()], before);
                session = result.new_session;
            }
        }
    }

    // Invariant 3: Exchange count never decreases and the offer is sticky
    #[test]
    fn prop_exchange_count_monotonic_and_offer_sticky(
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let mut session = Session::new();
        let ctx = test_context();
        let mut last_count = 0u32;
        let mut was_offered = false;

        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                session = result.new_session;
                if let SessionState::Conversing { exchange_count, diagnosis_offered } = &session.state {
                    prop_assert!(*exchange_count >= last_count);
                    prop_assert!(!was_offered || *diagnosis_offered, "Offer reverted");
                    prop_assert_eq!(
                        *diagnosis_offered,
                        *exchange_count >= ctx.offer_after
                    );
                    last_count = *exchange_count;
                    was_offered = *diagnosis_offered;
                }
            }
        }
    }

    // Invariant 4: Successful chat adds exactly one exchange, failure adds none
    #[test]
    fn prop_chat_outcome_counts(
        count in 0u32..10,
        text in "[a-zA-Z][a-zA-Z ]{0,20}",
        succeed in any::<bool>(),
        kind in arb_error_kind()
    ) {
        let mut session = conversing_session();
        session.state = SessionState::Conversing {
            exchange_count: count,
            diagnosis_offered: count >= test_context().offer_after,
        };
        let session = transition(&session, &test_context(), Event::UserMessage { text })
            .unwrap()
            .new_session;

        let event = if succeed {
            Event::ChatCompleted { reply: "ok".to_string(), confidence: None }
        } else {
            Event::ChatFailed { message: "down".to_string(), kind }
        };
        let next = transition(&session, &test_context(), event).unwrap().new_session;
        let expected = if succeed { count + 1 } else { count };
        prop_assert_eq!(next.state.exchange_count(), Some(expected));
        prop_assert_eq!(next.transcript.len(), session.transcript.len() + 1);
    }

    // Invariant 5: Confidence at or above the threshold always starts diagnosis
    #[test]
    fn prop_confidence_threshold(confidence in 0.0f64..200.0) {
        let session = transition(
            &conversing_session(),
            &test_context(),
            Event::UserMessage { text: "hello".to_string() },
        )
        .unwrap()
        .new_session;

        let result = transition(
            &session,
            &test_context(),
            Event::ChatCompleted { reply: "ok".to_string(), confidence: Some(confidence) },
        )
        .unwrap();

        let requested = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RequestDiagnosis { .. }));
        prop_assert_eq!(requested, confidence >= test_context().auto_diagnosis_threshold);
        prop_assert_eq!(
            result.new_session.pending.contains(RequestKind::Diagnosis),
            requested
        );
    }

    // Invariant 6: Busy sessions reject new messages without side effects
    #[test]
    fn prop_busy_rejects_messages(text in "[a-zA-Z][a-zA-Z ]{0,20}", diagnosing in any::<bool>()) {
        let mut session = conversing_session();
        session.pending.insert(if diagnosing { RequestKind::Diagnosis } else { RequestKind::Chat });

        let result = transition(&session, &test_context(), Event::UserMessage { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Invariant 7: The symptom message lists every selection in pick order
    #[test]
    fn prop_symptom_submission_message(
        picks in proptest::sample::subsequence(COMMON_SYMPTOMS.to_vec(), 0..6),
        custom in "[a-z]{0,10}"
    ) {
        prop_assume!(!picks.is_empty() || !custom.is_empty());

        let ctx = test_context();
        let mut session = transition(&Session::new(), &ctx, Event::ChooseSymptoms).unwrap().new_session;
        for pick in &picks {
            session = transition(&session, &ctx, Event::ToggleSymptom { symptom: (*pick).to_string() })
                .unwrap()
                .new_session;
        }
        session = transition(&session, &ctx, Event::SetCustomText { text: custom.clone() })
            .unwrap()
            .new_session;

        let next = transition(&session, &ctx, Event::SubmitSymptoms).unwrap().new_session;

        let mut expected: Vec<&str> = picks.clone();
        if !custom.is_empty() {
            expected.push(&custom);
        }
        prop_assert_eq!(&next.transcript.messages()[1].content, &symptom_message(&expected));
        prop_assert_eq!(next.state, SessionState::conversing());
    }
}
