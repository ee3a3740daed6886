//! Session runtime executor

use super::{Envelope, SessionUpdate};
use crate::backend::TriageService;
use crate::state_machine::{transition, Effect, Event, Session, SessionContext, TransitionError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Generic session runtime that can work with any triage backend
pub struct SessionRuntime<S>
where
    S: TriageService + 'static,
{
    context: SessionContext,
    session: Session,
    service: Arc<S>,
    event_rx: mpsc::Receiver<Envelope>,
    /// Weak so the loop ends once every handle is dropped and nothing is in flight
    event_tx: mpsc::WeakSender<Envelope>,
    update_tx: broadcast::Sender<SessionUpdate>,
    snapshot_tx: watch::Sender<Session>,
}

impl<S> SessionRuntime<S>
where
    S: TriageService + 'static,
{
    pub fn new(
        context: SessionContext,
        session: Session,
        service: S,
        event_rx: mpsc::Receiver<Envelope>,
        event_tx: &mpsc::Sender<Envelope>,
        update_tx: broadcast::Sender<SessionUpdate>,
        snapshot_tx: watch::Sender<Session>,
    ) -> Self {
        Self {
            context,
            session,
            service: Arc::new(service),
            event_rx,
            event_tx: event_tx.downgrade(),
            update_tx,
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        // One event at a time; network work happens in spawned tasks
        while let Some(Envelope { event, ack }) = self.event_rx.recv().await {
            let from_backend = event.is_network_completion();
            let outcome = self.process_event(event);
            if let Err(e) = &outcome {
                self.report_rejection(e, from_backend);
            }
            if let Some(ack) = ack {
                // Caller may have given up waiting
                let _ = ack.send(outcome);
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        if let Event::ChatFailed { message, kind } | Event::DiagnosisFailed { message, kind } =
            &event
        {
            tracing::warn!(kind = kind.as_str(), error = %message, "Backend request failed");
        }

        let result = transition(&self.session, &self.context, event)?;

        let old_state = self.session.state.name();
        self.session = result.new_session;
        if old_state != self.session.state.name() {
            tracing::info!(
                from = old_state,
                to = self.session.state.name(),
                "Session state changed"
            );
        }

        // Publish the snapshot before notifications so subscribers see it
        self.snapshot_tx.send_replace(self.session.clone());

        for effect in result.effects {
            self.execute_effect(effect);
        }

        Ok(())
    }

    fn report_rejection(&self, error: &TransitionError, from_backend: bool) {
        if error.is_user_facing() {
            tracing::info!(reason = %error, "User action rejected");
            let _ = self.update_tx.send(SessionUpdate::Rejected {
                reason: error.to_string(),
            });
        } else if from_backend {
            tracing::warn!(reason = %error, "Dropped stale backend result");
        } else {
            tracing::debug!(reason = %error, "Ignored event");
        }
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::Notify { update } => {
                // No subscribers is fine
                let _ = self.update_tx.send(update);
            }

            Effect::RequestChat { request } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    tracing::warn!("Session closed, chat request not sent");
                    return;
                };
                let service = self.service.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        history_len = request.conversation_history.len(),
                        "Making chat request (background)"
                    );

                    let event = match service.chat(&request).await {
                        Ok(reply) => Event::ChatCompleted {
                            reply: reply.response,
                            confidence: reply.confidence,
                        },
                        Err(e) => Event::ChatFailed {
                            message: e.message,
                            kind: e.kind,
                        },
                    };
                    let _ = event_tx.send(event.into()).await;
                });
            }

            Effect::RequestDiagnosis { request } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    tracing::warn!("Session closed, diagnosis request not sent");
                    return;
                };
                let service = self.service.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        history_len = request.conversation_history.len(),
                        "Making diagnosis request (background)"
                    );

                    let event = match service.diagnose(&request).await {
                        Ok(assessment) => Event::DiagnosisCompleted { assessment },
                        Err(e) => Event::DiagnosisFailed {
                            message: e.message,
                            kind: e.kind,
                        },
                    };
                    let _ = event_tx.send(event.into()).await;
                });
            }
        }
    }
}
