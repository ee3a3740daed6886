//! Entry modes: free chat or a structured symptom list

use super::transition::TransitionError;
use crate::backend::ChatRequest;
use crate::transcript::{Message, Transcript};
use serde::{Deserialize, Serialize};

/// Greeting for sessions that start in free chat
pub const CHAT_GREETING: &str = "Hello! I'm CarePath, your medical guidance assistant. \
I'm here to help understand your symptoms and guide you to the right care.\n\n\
What brings you here today? Please describe any symptoms you're experiencing.";

/// Greeting for sessions seeded from the symptom picker
pub const SYMPTOM_GREETING: &str = "Hello! I'm CarePath, your medical guidance assistant. \
I'm here to help understand your symptoms and guide you to the right care.";

const SYMPTOM_PREFIX: &str = "I am experiencing: ";

/// Symptoms offered by the picker
pub const COMMON_SYMPTOMS: [&str; 18] = [
    "Headache",
    "Fever",
    "Cough",
    "Fatigue",
    "Chest Pain",
    "Shortness of Breath",
    "Nausea",
    "Dizziness",
    "Abdominal Pain",
    "Back Pain",
    "Joint Pain",
    "Sore Throat",
    "Runny Nose",
    "Vomiting",
    "Diarrhea",
    "Weight Loss",
    "Anxiety",
    "Depression",
];

/// Symptoms picked so far plus free-text extras.
///
/// `selected` behaves as a set; insertion order is kept only so the
/// submitted message reads in the order the user picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomSelection {
    selected: Vec<String>,
    custom_text: String,
}

impl SymptomSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the symptom if absent, remove it if present. Returns whether it
    /// is selected afterwards.
    pub fn toggle(&mut self, symptom: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == symptom) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(symptom.to_string());
            true
        }
    }

    pub fn is_selected(&self, symptom: &str) -> bool {
        self.selected.iter().any(|s| s == symptom)
    }

    #[cfg(test)]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn set_custom_text(&mut self, text: impl Into<String>) {
        self.custom_text = text.into();
    }

    /// Trimmed custom text, if any
    pub fn custom_symptom(&self) -> Option<&str> {
        let trimmed = self.custom_text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Picked symptoms followed by the custom one, without duplicates
    pub fn all_symptoms(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self.selected.iter().map(String::as_str).collect();
        if let Some(custom) = self.custom_symptom() {
            if !all.contains(&custom) {
                all.push(custom);
            }
        }
        all
    }

    pub fn is_submittable(&self) -> bool {
        !self.selected.is_empty() || self.custom_symptom().is_some()
    }
}

/// Transcript and first request produced by the symptom entry path
#[derive(Debug, Clone)]
pub struct SeededConversation {
    pub transcript: Transcript,
    pub opening_request: ChatRequest,
}

/// Synthetic user message summarising the picked symptoms
pub fn symptom_message(symptoms: &[&str]) -> String {
    format!("{SYMPTOM_PREFIX}{}", symptoms.join(", "))
}

/// Transcript for a session that starts in free chat
pub fn start_chat() -> Transcript {
    let mut transcript = Transcript::new();
    transcript.push(Message::assistant(CHAT_GREETING));
    transcript
}

/// Seed a conversation from the picker.
///
/// The opening request carries the synthetic message separately and only
/// the greeting as history, matching every later round-trip where history is
/// the transcript before the new user message.
pub fn start_from_symptoms(
    selection: &SymptomSelection,
) -> Result<SeededConversation, TransitionError> {
    if !selection.is_submittable() {
        return Err(TransitionError::NoSymptomProvided);
    }

    let greeting = Message::assistant(SYMPTOM_GREETING);
    let content = symptom_message(&selection.all_symptoms());

    let opening_request = ChatRequest {
        message: content.clone(),
        conversation_history: vec![greeting.clone()],
    };

    let mut transcript = Transcript::new();
    transcript.push(greeting);
    transcript.push(Message::user(content));

    Ok(SeededConversation {
        transcript,
        opening_request,
    })
}
