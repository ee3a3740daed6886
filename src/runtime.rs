//! Runtime for driving a triage session
//!
//! Owns the session, applies transitions on a single event loop, and runs
//! network effects as background tasks whose results come back as events.

mod executor;


pub use executor::SessionRuntime;

use crate::backend::{Assessment, TriageService};
use crate::state_machine::{Event, Session, SessionContext, SessionState, TransitionError};
use crate::transcript::Message;
use crate::urgency::Tier;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::Instrument;

/// Events sent to subscribers (the terminal front end, tests)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    MessageAppended {
        message: Message,
    },
    StateChanged {
        state: SessionState,
        /// A request is in flight; input should be disabled
        loading: bool,
        /// The "ready for diagnosis" action is shown
        diagnosis_available: bool,
    },
    AssessmentReady {
        assessment: Assessment,
        tier: Tier,
    },
    /// A user action was refused and should be explained near the input
    Rejected {
        reason: String,
    },
}

/// An event on its way into the runtime, with an optional reply channel
/// for the transition outcome
pub(crate) struct Envelope {
    pub event: Event,
    pub ack: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

impl From<Event> for Envelope {
    fn from(event: Event) -> Self {
        Self { event, ack: None }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session runtime has stopped")]
    Stopped,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    event_tx: mpsc::Sender<Envelope>,
    update_tx: broadcast::Sender<SessionUpdate>,
    snapshot_rx: watch::Receiver<Session>,
}

impl SessionHandle {
    /// Queue an event and wait until the runtime has applied or rejected it.
    ///
    /// Once this returns, `snapshot()` reflects the event. Background
    /// request results may land later.
    pub async fn dispatch(
        &self,
        event: Event,
    ) -> Result<Result<(), TransitionError>, RuntimeError> {
        let (ack, outcome) = oneshot::channel();
        self.event_tx
            .send(Envelope {
                event,
                ack: Some(ack),
            })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        outcome.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Subscribe to session updates from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.update_tx.subscribe()
    }

    /// Latest committed session
    pub fn snapshot(&self) -> Session {
        self.snapshot_rx.borrow().clone()
    }

    #[cfg(test)]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.snapshot_rx.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Spawn a runtime for a fresh session
pub fn start_session<S>(context: SessionContext, service: S) -> SessionHandle
where
    S: TriageService + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(32);
    let (update_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(Session::new());

    let session_id = context.session_id.clone();
    let span = tracing::info_span!("session", session_id = %session_id);

    let runtime = SessionRuntime::new(
        context,
        Session::new(),
        service,
        event_rx,
        &event_tx,
        update_tx.clone(),
        snapshot_tx,
    );

    tokio::spawn(
        async move {
            runtime.run().await;
            tracing::info!("Session runtime finished");
        }
        .instrument(span),
    );

    SessionHandle {
        session_id,
        event_tx,
        update_tx,
        snapshot_rx,
    }
}
