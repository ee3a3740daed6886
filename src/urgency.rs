//! Urgency classification for assessments
//!
//! Presentation only: the tier never feeds back into session state.

use serde::Serialize;
use std::fmt;

/// Three-level severity derived from the backend's urgency label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Emergency,
    Urgent,
    Routine,
}

const EMERGENCY_MARKER: &str = "Emergency";
const URGENT_MARKER: &str = "Urgent";

/// Map a free-text urgency label to a tier.
///
/// Case-sensitive substring match against the backend vocabulary; the
/// emergency marker wins when both appear.
pub fn classify(urgency_level: &str) -> Tier {
    if urgency_level.contains(EMERGENCY_MARKER) {
        Tier::Emergency
    } else if urgency_level.contains(URGENT_MARKER) {
        Tier::Urgent
    } else {
        Tier::Routine
    }
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Emergency => "EMERGENCY",
            Tier::Urgent => "URGENT",
            Tier::Routine => "ROUTINE",
        }
    }

    /// ANSI color used by the terminal renderer
    pub fn ansi_color(self) -> &'static str {
        match self {
            Tier::Emergency => "\x1b[31m",
            Tier::Urgent => "\x1b[33m",
            Tier::Routine => "\x1b[32m",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
