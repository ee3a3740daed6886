//! Diagnosis trigger conditions
//!
//! Two independent predicates evaluated after every successful chat
//! round-trip. Both lead to the same diagnosis request.

use super::SessionContext;

/// Manual offer: enough exchanges have completed.
///
/// Evaluated against the count *after* the exchange that just finished, so
/// with the default of 3 the action appears once the third reply arrives.
pub fn should_offer_diagnosis(exchange_count: u32, context: &SessionContext) -> bool {
    exchange_count >= context.offer_after
}

/// Automatic trigger: the backend is confident enough to diagnose now
pub fn should_auto_diagnose(confidence: Option<f64>, context: &SessionContext) -> bool {
    confidence.is_some_and(|c| c >= context.auto_diagnosis_threshold)
}
