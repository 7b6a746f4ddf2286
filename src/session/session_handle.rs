//! Session handle - runs a listening session in a tokio task
//!
//! Spawns the session, hands out the text sender and the event receiver, and
//! performs the ordered stop: stop intake, cancel timers, neutralize the
//! controller, then report.
//!
//! A session can be paused and resumed without stopping it. Pausing only
//! affects recognized text; pending tap releases still fire.

use super::events::{SessionEvent, SessionReport, SessionStatus};
use super::voice_session::VoiceSession;
use crate::controller::ControllerSink;
use crate::mapping::{InputMatcher, MatchPolicy, Profile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Queue capacities for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Recognized text waiting to be matched
    pub text_queue: usize,
    /// Release timers that fired but were not yet applied
    pub timer_queue: usize,
    /// Events waiting for the observer; overflow is dropped
    pub event_queue: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            text_queue: 100,
            timer_queue: 100,
            event_queue: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session settings: {0}")]
    InvalidSettings(String),

    #[error("Session already stopped")]
    AlreadyStopped,

    #[error("Session task failed: {0}")]
    TaskFailed(String),
}

/// Handle for a session running in a background task
#[derive(Debug)]
pub struct SessionHandle {
    profile_name: String,
    status_rx: watch::Receiver<SessionStatus>,
    pause_tx: watch::Sender<bool>,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<SessionReport>>,
}

impl SessionHandle {
    /// Starts a session for `profile` driving `sink`.
    ///
    /// # Returns
    ///
    /// * The handle
    /// * Sender for recognized text; the session ends once every clone is dropped
    /// * Receiver for session events
    pub fn spawn(
        profile: Arc<Profile>,
        sink: Box<dyn ControllerSink>,
        policy: MatchPolicy,
        settings: SessionSettings,
    ) -> Result<(Self, mpsc::Sender<String>, mpsc::Receiver<SessionEvent>), SessionError> {
        if settings.text_queue == 0 || settings.timer_queue == 0 || settings.event_queue == 0 {
            return Err(SessionError::InvalidSettings(format!(
                "queue capacities must be positive: {:?}",
                settings
            )));
        }

        let (text_tx, text_rx) = mpsc::channel(settings.text_queue);
        let (timer_tx, timer_rx) = mpsc::channel(settings.timer_queue);
        let (event_tx, event_rx) = mpsc::channel(settings.event_queue);
        let (status_tx, status_rx) = watch::channel(SessionStatus::Starting);
        let (pause_tx, pause_rx) = watch::channel(false);
        debug!("Created session channels with {:?}", settings);

        let profile_name = profile.name.clone();
        let session = VoiceSession::create(
            profile,
            InputMatcher::new(policy),
            sink,
            text_rx,
            timer_tx,
            timer_rx,
            event_tx,
            status_tx,
            pause_rx,
        )
        .start();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_name = profile_name.clone();
        let task_handle = tokio::spawn(async move {
            info!("Spawning listening session: {}", task_name);
            session
                .run_until_shutdown(task_cancel)
                .await
                .shutdown()
                .into_report()
        });

        Ok((
            Self {
                profile_name,
                status_rx,
                pause_tx,
                cancel,
                task_handle: Some(task_handle),
            },
            text_tx,
            event_rx,
        ))
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }

    /// Ignores recognized text until [`resume`](Self::resume) is called.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.set_paused(true)
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> Result<(), SessionError> {
        if self.task_handle.is_none()
            || matches!(
                self.status(),
                SessionStatus::Stopping | SessionStatus::Stopped
            )
        {
            return Err(SessionError::AlreadyStopped);
        }
        let was_paused = self.pause_tx.send_replace(paused);
        if was_paused != paused {
            debug!(
                "Session '{}' pause set to {}",
                self.profile_name, paused
            );
        }
        Ok(())
    }

    /// Resolves once the session has stopped on its own or been stopped.
    pub async fn stopped(&self) {
        let mut status_rx = self.status_rx.clone();
        if status_rx
            .wait_for(|status| *status == SessionStatus::Stopped)
            .await
            .is_err()
        {
            debug!("Session task gone: {}", self.profile_name);
        }
    }

    /// Stops the session and waits for its cleanup to finish.
    pub async fn stop(&mut self) -> Result<SessionReport, SessionError> {
        debug!("Sending stop signal to session: {}", self.profile_name);
        self.cancel.cancel();

        let Some(handle) = self.task_handle.take() else {
            return Err(SessionError::AlreadyStopped);
        };
        match handle.await {
            Ok(report) => {
                info!(
                    "Session '{}' finished: {} received, {} matched, {} failed",
                    self.profile_name, report.received, report.matched, report.failed
                );
                Ok(report)
            }
            Err(e) => {
                error!("Session task panicked: {} - {}", self.profile_name, e);
                Err(SessionError::TaskFailed(e.to_string()))
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::sink::testing::{RecordingSink, SinkCall};
    use crate::mapping::{Axis, Button, MappingRecord};
    use crate::session::events::{ExitReason, SessionEventKind};
    use std::time::Duration;
    use tokio::time::Instant;

    fn record(
        voice_command: &str,
        target_input: &str,
        action_type: &str,
        duration_ms: Option<i64>,
        analog_value: Option<f64>,
    ) -> MappingRecord {
        MappingRecord {
            voice_command: voice_command.to_string(),
            target_input: target_input.to_string(),
            action_type: action_type.to_string(),
            duration_ms,
            analog_value,
        }
    }

    fn spawn(
        records: Vec<MappingRecord>,
        sink: &RecordingSink,
    ) -> (SessionHandle, mpsc::Sender<String>, mpsc::Receiver<SessionEvent>) {
        let loaded = Profile::from_records("test", records);
        assert!(loaded.rejected.is_empty());
        SessionHandle::spawn(
            Arc::new(loaded.profile),
            Box::new(sink.clone()),
            MatchPolicy::default(),
            SessionSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_within_sentence_taps_a() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) =
            spawn(vec![record("jump", "a", "tap", Some(200), None)], &sink);
        assert_eq!(handle.status(), SessionStatus::Listening);

        let start = Instant::now();
        text_tx.send("I say jump now".to_string()).await.unwrap();

        let matched = events.recv().await.unwrap();
        assert!(matches!(matched.kind, SessionEventKind::Matched { .. }));
        assert_eq!(sink.calls(), vec![SinkCall::Press(Button::A)]);

        let released = events.recv().await.unwrap();
        assert_eq!(
            released.kind,
            SessionEventKind::TimerRelease { button: Button::A }
        );
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(
            sink.calls(),
            vec![SinkCall::Press(Button::A), SinkCall::Release(Button::A)]
        );

        let report = handle.stop().await.unwrap();
        assert_eq!(report.timer_releases, 1);
        assert!(report.shutdown.buttons_released.is_empty());
    }

    #[tokio::test]
    async fn test_block_then_release_block() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) = spawn(
            vec![
                record("block", "b", "hold", None, None),
                record("release block", "b", "release", None, None),
            ],
            &sink,
        );

        text_tx.send("block".to_string()).await.unwrap();
        text_tx.send("release block".to_string()).await.unwrap();
        events.recv().await.unwrap();
        events.recv().await.unwrap();

        assert_eq!(
            sink.calls(),
            vec![SinkCall::Press(Button::B), SinkCall::Release(Button::B)]
        );
        let report = handle.stop().await.unwrap();
        assert_eq!(report.matched, 2);
    }

    #[tokio::test]
    async fn test_walk_left_sets_axis_once() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) = spawn(
            vec![record("walk left", "left_stick_x", "analog", None, Some(-0.5))],
            &sink,
        );

        text_tx.send("walk left".to_string()).await.unwrap();
        events.recv().await.unwrap();
        assert_eq!(sink.calls(), vec![SinkCall::SetAxis(Axis::LeftStickX, -0.5)]);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.shutdown.axes_neutralized, vec![Axis::LeftStickX]);
        assert_eq!(
            sink.calls().last(),
            Some(&SinkCall::SetAxis(Axis::LeftStickX, 0.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_neutralizes_controller() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) = spawn(
            vec![
                record("long up", "dpad_up", "tap", Some(800), None),
                record("block", "b", "hold", None, None),
            ],
            &sink,
        );
        let mut status = handle.subscribe_status();

        text_tx.send("long up".to_string()).await.unwrap();
        text_tx.send("block".to_string()).await.unwrap();
        events.recv().await.unwrap();
        events.recv().await.unwrap();

        let report = handle.stop().await.unwrap();
        assert_eq!(report.exit_reason, ExitReason::StopRequested);
        assert_eq!(report.shutdown.timers_cancelled, 1);
        assert_eq!(
            report.shutdown.buttons_released,
            vec![Button::B, Button::DPadUp]
        );
        assert_eq!(*status.borrow_and_update(), SessionStatus::Stopped);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let releases = sink
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SinkCall::Release(_)))
            .count();
        assert_eq!(releases, 2);
        assert!(matches!(
            handle.stop().await,
            Err(SessionError::AlreadyStopped)
        ));
    }

    #[tokio::test]
    async fn test_stop_before_processing_discards_text() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, _events) =
            spawn(vec![record("jump", "a", "tap", Some(200), None)], &sink);

        text_tx.try_send("jump".to_string()).unwrap();
        text_tx.try_send("jump".to_string()).unwrap();
        let report = handle.stop().await.unwrap();

        assert_eq!(report.received, 0);
        assert_eq!(report.discarded_on_stop, 2);
        assert!(sink.calls().is_empty());
        assert!(text_tx.send("jump".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_session_ends_when_producers_hang_up() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, _events) =
            spawn(vec![record("jump", "a", "tap", Some(200), None)], &sink);

        drop(text_tx);
        handle.stopped().await;
        let report = handle.stop().await.unwrap();
        assert_eq!(report.exit_reason, ExitReason::InputClosed);
    }

    #[tokio::test]
    async fn test_pause_ignores_text_until_resumed() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) = spawn(
            vec![
                record("block", "b", "hold", None, None),
                record("jump", "a", "tap", Some(200), None),
            ],
            &sink,
        );
        let mut status = handle.subscribe_status();

        handle.pause().unwrap();
        assert!(handle.is_paused());
        status
            .wait_for(|s| *s == SessionStatus::Paused)
            .await
            .unwrap();

        text_tx.send("block".to_string()).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap().kind,
            SessionEventKind::IgnoredWhilePaused {
                text: "block".to_string()
            }
        );
        assert!(sink.calls().is_empty());

        handle.resume().unwrap();
        status
            .wait_for(|s| *s == SessionStatus::Listening)
            .await
            .unwrap();
        text_tx.send("block".to_string()).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap().kind,
            SessionEventKind::Matched { .. }
        ));
        assert_eq!(sink.calls(), vec![SinkCall::Press(Button::B)]);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.received, 2);
        assert_eq!(report.ignored_while_paused, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(report.shutdown.buttons_released, vec![Button::B]);
        assert!(matches!(handle.pause(), Err(SessionError::AlreadyStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_pending_release() {
        let sink = RecordingSink::new();
        let (mut handle, text_tx, mut events) =
            spawn(vec![record("jump", "a", "tap", Some(200), None)], &sink);

        text_tx.send("jump".to_string()).await.unwrap();
        events.recv().await.unwrap();
        handle.pause().unwrap();

        assert_eq!(
            events.recv().await.unwrap().kind,
            SessionEventKind::TimerRelease { button: Button::A }
        );
        assert_eq!(
            sink.calls(),
            vec![SinkCall::Press(Button::A), SinkCall::Release(Button::A)]
        );
        assert_eq!(handle.status(), SessionStatus::Paused);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.timer_releases, 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let settings = SessionSettings {
            event_queue: 0,
            ..Default::default()
        };
        let result = SessionHandle::spawn(
            Arc::new(Profile::default_profile()),
            Box::new(RecordingSink::new()),
            MatchPolicy::default(),
            settings,
        );
        assert!(matches!(result, Err(SessionError::InvalidSettings(_))));
    }
}
