//! Terminal front end
//!
//! Reads commands from the terminal, turns them into session events, and
//! prints session updates as they arrive.

mod input;

pub use input::{LineSource, ReadlineInput};

use crate::backend::Assessment;
use crate::runtime::{RuntimeError, SessionHandle, SessionUpdate};
use crate::state_machine::entry::COMMON_SYMPTOMS;
use crate::state_machine::{Event, SessionState, TransitionError};
use crate::transcript::{Message, Role};
use crate::urgency::Tier;
use std::fmt::Write as _;
use thiserror::Error;
use tokio::sync::broadcast;

const PROMPT: &str = "> ";
const COMPLETE_HINT: &str = "The assessment is complete. Type /quit to leave";

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

pub const DISCLAIMER: &str = "This is not a medical diagnosis. This assessment is for \
informational purposes only and should not replace professional medical advice. Please \
consult a qualified healthcare professional for proper evaluation and treatment.";

const WELCOME: &str = "\
How would you like to start?
  /chat       describe your symptoms in your own words
  /symptoms   pick from a list of common symptoms
  /help       show all commands
  /quit       leave";

const HELP: &str = "\
Commands:
  /chat               start a free-text conversation
  /symptoms           open the symptom picker
  /toggle <n|name>    select or deselect a symptom in the picker
  /other <text>       describe another symptom (or just type it in the picker)
  /submit             start the conversation from the picked symptoms
  /back               leave the picker
  /diagnose           request an assessment once it is offered
  /quit               leave
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat,
    Symptoms,
    Toggle(String),
    Other(String),
    Submit,
    Back,
    Diagnose,
    Text(String),
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("No symptom numbered {0}; pick 1-{max}", max = COMMON_SYMPTOMS.len())]
    NoSuchSymptom(usize),
}

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Text(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "chat" => Ok(Command::Chat),
        "symptoms" => Ok(Command::Symptoms),
        "toggle" | "t" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument("toggle"));
            }
            Ok(Command::Toggle(resolve_symptom(arg)?))
        }
        "other" => Ok(Command::Other(arg.to_string())),
        "submit" => Ok(Command::Submit),
        "back" => Ok(Command::Back),
        "diagnose" => Ok(Command::Diagnose),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// A catalogue number (1-based) or a symptom name
fn resolve_symptom(arg: &str) -> Result<String, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) => n
            .checked_sub(1)
            .and_then(|i| COMMON_SYMPTOMS.get(i))
            .map(|s| (*s).to_string())
            .ok_or(CommandError::NoSuchSymptom(n)),
        Err(_) => Ok(COMMON_SYMPTOMS
            .iter()
            .find(|s| s.eq_ignore_ascii_case(arg))
            .map_or_else(|| arg.to_string(), |s| (*s).to_string())),
    }
}

impl Command {
    /// The session event for this command. Free text fills the custom
    /// symptom box while picking, and is a chat message otherwise.
    pub fn into_event(self, state: &SessionState) -> Option<Event> {
        match self {
            Command::Chat => Some(Event::StartChat),
            Command::Symptoms => Some(Event::ChooseSymptoms),
            Command::Toggle(symptom) => Some(Event::ToggleSymptom { symptom }),
            Command::Other(text) => Some(Event::SetCustomText { text }),
            Command::Submit => Some(Event::SubmitSymptoms),
            Command::Back => Some(Event::Back),
            Command::Diagnose => Some(Event::RequestDiagnosis),
            Command::Text(text) => match state {
                SessionState::PickingSymptoms { .. } => Some(Event::SetCustomText { text }),
                _ => Some(Event::UserMessage { text }),
            },
            Command::Help | Command::Quit | Command::Empty => None,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_message(message: &Message) -> String {
    match message.role {
        Role::Assistant => format!("{BOLD}CarePath:{RESET} {}", message.content),
        Role::User => format!("{DIM}You:{RESET} {}", message.content),
    }
}

fn render_picker(state: &SessionState) -> Option<String> {
    let SessionState::PickingSymptoms { selection } = state else {
        return None;
    };

    let mut out = String::from("Select your symptoms:\n");
    for (i, symptom) in COMMON_SYMPTOMS.iter().enumerate() {
        let mark = if selection.is_selected(symptom) { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {:>2}. {symptom}", i + 1);
    }
    if let Some(custom) = selection.custom_symptom() {
        let _ = writeln!(out, "  Other: {custom}");
    }
    out.push_str("/toggle <n>, type other symptoms, /submit when done, /back to return");
    Some(out)
}

pub fn render_assessment(assessment: &Assessment, tier: Tier) -> String {
    let color = tier.ansi_color();
    let mut out = String::new();

    let _ = writeln!(out, "{BOLD}Assessment Results{RESET} (based on our conversation)");
    let _ = writeln!(out, "  Possible Condition:     {}", assessment.condition);
    let _ = writeln!(out, "  Category:               {}", assessment.category);
    let _ = writeln!(out, "  Confidence:             {}", assessment.confidence);
    let _ = writeln!(
        out,
        "  {color}[{tier}] Urgency Level: {}{RESET}",
        assessment.urgency_level
    );
    let _ = writeln!(out, "  {color}{}{RESET}", assessment.action);
    let _ = writeln!(out, "  Recommended Specialist: {}", assessment.specialist);
    if !assessment.other_possibilities.is_empty() {
        let _ = writeln!(
            out,
            "  Other Possibilities:    {}",
            assessment.other_possibilities.join(", ")
        );
    }
    let _ = write!(out, "\n{BOLD}Important Disclaimer{RESET}\n{DISCLAIMER}");
    out
}

/// Text to print for an update, if any
pub fn render_update(update: &SessionUpdate) -> Option<String> {
    match update {
        SessionUpdate::MessageAppended { message } => Some(render_message(message)),
        SessionUpdate::StateChanged {
            state,
            loading,
            diagnosis_available,
        } => match state {
            SessionState::Unstarted => Some(WELCOME.to_string()),
            SessionState::PickingSymptoms { .. } => render_picker(state),
            SessionState::Conversing { .. } if *loading => Some(format!("{DIM}...{RESET}")),
            SessionState::Conversing { .. } if *diagnosis_available => Some(format!(
                "{BOLD}[Ready for Diagnosis]{RESET} type /diagnose for an assessment"
            )),
            SessionState::Conversing { .. } | SessionState::Diagnosed { .. } => None,
        },
        SessionUpdate::AssessmentReady { assessment, tier } => {
            Some(render_assessment(assessment, *tier))
        }
        SessionUpdate::Rejected { reason } => Some(format!("! {reason}")),
    }
}

/// What to tell the user when a command is refused. `None` when the
/// runtime already reports the refusal as an update.
pub fn rejection_hint(error: &TransitionError, state: &SessionState) -> Option<&'static str> {
    let hint = match error {
        TransitionError::NoSymptomProvided | TransitionError::EmptyMessage => return None,
        TransitionError::Busy => "Please wait for the current reply",
        TransitionError::DiagnosisPending => "Your assessment is already being prepared",
        TransitionError::DiagnosisNotOffered => {
            "Diagnosis becomes available after a few more exchanges. Keep describing your symptoms"
        }
        TransitionError::SessionComplete => COMPLETE_HINT,
        TransitionError::InvalidTransition(_) => match state {
            SessionState::Unstarted => "Start with /chat or /symptoms",
            SessionState::PickingSymptoms { .. } => {
                "Pick symptoms with /toggle, then /submit (or /back)"
            }
            SessionState::Conversing { .. } => "A conversation is already in progress",
            SessionState::Diagnosed { .. } => COMPLETE_HINT,
        },
    };
    Some(hint)
}

// ============================================================================
// Loop
// ============================================================================

async fn print_updates(mut updates: broadcast::Receiver<SessionUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => {
                if let Some(text) = render_update(&update) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Terminal fell behind session updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Drive a session from terminal input until `/quit` or end of input
pub async fn run<L>(handle: SessionHandle, input: &mut L) -> Result<(), ReplError>
where
    L: LineSource + ?Sized,
{
    let printer = tokio::spawn(print_updates(handle.subscribe()));
    println!("{WELCOME}");

    while let Some(line) = input.next_line(PROMPT).await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            command => {
                // Each dispatch waits for its transition, so this is current
                // for everything but background replies
                let state = handle.snapshot().state;
                let Some(event) = command.into_event(&state) else {
                    continue;
                };
                if let Err(e) = handle.dispatch(event).await? {
                    if let Some(hint) = rejection_hint(&e, &handle.snapshot().state) {
                        println!("! {hint}");
                    }
                }
            }
        }
    }

    printer.abort();
    tracing::info!(session_id = handle.session_id(), "Leaving session");
    Ok(())
}
