//! Listening session with statum state machine
//!
//! A session owns the dispatcher and consumes two streams in one task:
//! recognized text and tap release timers. Everything that changes the
//! controller goes through this single loop.
//!
//! While paused, recognized text is dropped without matching. Release timers
//! keep firing and held buttons stay held.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Listening ──► ShuttingDown ──► Stopped
//! ```
//!
//! # Architecture
//!
//! ```text
//! text_rx ───► [InputMatcher] ──► ActionDispatcher ──► ControllerSink
//!                                   │        ▲
//!                                   ▼        │
//!                           ReleaseScheduler ─► timer_rx
//!
//! events ──► event_tx (try_send)    status ──► watch
//! ```

use super::events::{ExitReason, SessionEvent, SessionEventKind, SessionReport, SessionStatus};
use crate::controller::{ActionDispatcher, ControllerSink, TimerFired};
use crate::mapping::{InputMatcher, Profile};
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Initializing, // Dispatcher built, nothing consumed yet
    Listening,    // Consuming text and timers
    ShuttingDown, // Loop left, cleanup pending
    Stopped,      // Controller neutral, report ready
}

#[machine]
pub struct VoiceSession<S: SessionState> {
    profile: Arc<Profile>,
    matcher: InputMatcher,
    dispatcher: ActionDispatcher,
    text_rx: mpsc::Receiver<String>,
    timer_rx: mpsc::Receiver<TimerFired>,
    event_tx: mpsc::Sender<SessionEvent>,
    status_tx: watch::Sender<SessionStatus>,
    pause_rx: watch::Receiver<bool>,
    report: SessionReport,
}

impl<S: SessionState> VoiceSession<S> {
    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }

    /// Counters so far
    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Publishes Paused or Listening from the current pause flag.
    fn publish_pause_state(&mut self) {
        let paused = *self.pause_rx.borrow_and_update();
        let status = if paused {
            SessionStatus::Paused
        } else {
            SessionStatus::Listening
        };
        if *self.status_tx.borrow() != status {
            info!("Session '{}' {}", self.profile.name, status);
        }
        self.status_tx.send_replace(status);
    }

    fn emit(&self, kind: SessionEventKind) {
        match self.event_tx.try_send(SessionEvent::now(kind)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Event consumer lagging, dropping: {}", event);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("No event consumer attached");
            }
        }
    }
}

impl VoiceSession<Initializing> {
    /// Builds a session. `timer_tx` must feed `timer_rx`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        profile: Arc<Profile>,
        matcher: InputMatcher,
        sink: Box<dyn ControllerSink>,
        text_rx: mpsc::Receiver<String>,
        timer_tx: mpsc::Sender<TimerFired>,
        timer_rx: mpsc::Receiver<TimerFired>,
        event_tx: mpsc::Sender<SessionEvent>,
        status_tx: watch::Sender<SessionStatus>,
        pause_rx: watch::Receiver<bool>,
    ) -> Self {
        info!(
            "Initializing session for profile '{}' ({} mappings)",
            profile.name,
            profile.mappings.len()
        );
        let report = SessionReport {
            profile: profile.name.clone(),
            ..Default::default()
        };
        status_tx.send_replace(SessionStatus::Starting);

        Self::new(
            profile,
            matcher,
            ActionDispatcher::new(sink, timer_tx),
            text_rx,
            timer_rx,
            event_tx,
            status_tx,
            pause_rx,
            report,
        )
    }

    pub fn start(mut self) -> VoiceSession<Listening> {
        info!("Session '{}' listening", self.profile.name);
        self.publish_pause_state();
        self.transition()
    }
}

impl VoiceSession<Listening> {
    pub fn is_paused(&self) -> bool {
        *self.pause_rx.borrow()
    }

    /// Matches one recognized text and applies the resulting action.
    pub fn handle_text(&mut self, text: String) {
        self.report.received += 1;

        if self.is_paused() {
            debug!("Paused, ignoring '{}'", text);
            self.report.ignored_while_paused += 1;
            self.emit(SessionEventKind::IgnoredWhilePaused { text });
            return;
        }

        let Some(found) = self.matcher.find(&text, &self.profile) else {
            debug!("No mapping for '{}'", text);
            self.report.unmatched += 1;
            self.emit(SessionEventKind::Unmatched { text });
            return;
        };
        let action = found.mapping.action;
        let voice_command = found.mapping.voice_command.clone();
        let kind = found.kind;
        debug!(
            "'{}' matched mapping #{} '{}' ({:?})",
            text, found.index, voice_command, kind
        );

        match self.dispatcher.dispatch(&action) {
            Ok(outcome) => {
                debug!("Dispatch outcome: {:?}", outcome);
                self.report.matched += 1;
                self.emit(SessionEventKind::Matched {
                    text,
                    voice_command,
                    action,
                    kind,
                });
            }
            Err(e) => {
                warn!("Failed to apply '{}': {}", voice_command, e);
                self.report.failed += 1;
                self.emit(SessionEventKind::DispatchFailed {
                    text,
                    action,
                    error: e,
                });
            }
        }
    }

    pub fn handle_timer(&mut self, fired: TimerFired) {
        match self.dispatcher.on_timer_fired(fired) {
            Ok(Some(button)) => {
                self.report.timer_releases += 1;
                self.emit(SessionEventKind::TimerRelease { button });
            }
            Ok(None) => {}
            Err(e) => {
                error!("Timed release of {} failed: {}", fired.button, e);
                self.report.failed += 1;
            }
        }
    }

    /// Consumes text and timer events until cancelled or the text producers
    /// hang up.
    pub async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> VoiceSession<ShuttingDown> {
        info!("Starting listening loop for: {}", self.profile.name);
        let mut pause_open = true;

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Stop requested for: {}", self.profile.name);
                    break ExitReason::StopRequested;
                }

                changed = self.pause_rx.changed(), if pause_open => match changed {
                    Ok(()) => self.publish_pause_state(),
                    Err(_) => {
                        debug!("Pause control dropped for: {}", self.profile.name);
                        pause_open = false;
                    }
                },

                // the dispatcher holds a timer sender, so this never yields None
                Some(fired) = self.timer_rx.recv() => self.handle_timer(fired),

                text = self.text_rx.recv() => match text {
                    Some(text) => self.handle_text(text),
                    None => {
                        info!("All text producers gone for: {}", self.profile.name);
                        break ExitReason::InputClosed;
                    }
                },
            }
        };

        self.report.exit_reason = reason;
        self.transition()
    }
}

impl VoiceSession<ShuttingDown> {
    /// Drops queued text, cancels timers and neutralizes the controller.
    pub fn shutdown(mut self) -> VoiceSession<Stopped> {
        info!("Shutting down session: {}", self.profile.name);
        self.status_tx.send_replace(SessionStatus::Stopping);

        self.text_rx.close();
        let mut discarded = 0;
        while self.text_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!("Discarded {} unprocessed text items", discarded);
        }
        self.report.discarded_on_stop = discarded;

        self.report.shutdown = self.dispatcher.shutdown();
        self.status_tx.send_replace(SessionStatus::Stopped);
        info!("Session stopped: {}", self.profile.name);
        self.transition()
    }
}

impl VoiceSession<Stopped> {
    pub fn into_report(self) -> SessionReport {
        self.report
    }
}
