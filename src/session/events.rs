//! What a listening session reports to the outside

use crate::controller::{DispatchError, ShutdownSummary};
use crate::mapping::{Button, ControllerAction, MatchKind};
use chrono::{DateTime, Local};
use std::fmt;

/// Lifecycle status, published through a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Listening,
    /// Running, but recognized text is ignored
    Paused,
    Stopping,
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Listening => "listening",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// Text matched a mapping and the action was applied
    Matched {
        text: String,
        voice_command: String,
        action: ControllerAction,
        kind: MatchKind,
    },
    Unmatched {
        text: String,
    },
    /// Text arrived while the session was paused
    IgnoredWhilePaused {
        text: String,
    },
    /// Text matched but the controller rejected the action
    DispatchFailed {
        text: String,
        action: ControllerAction,
        error: DispatchError,
    },
    /// A tap's timed release was applied
    TimerRelease {
        button: Button,
    },
}

/// Timestamped session event
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn now(kind: SessionEventKind) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.timestamp.format("%H:%M:%S%.3f"))?;
        match &self.kind {
            SessionEventKind::Matched {
                text,
                voice_command,
                action,
                kind,
            } => write!(
                f,
                "'{}' matched '{}' ({:?}) -> {}",
                text, voice_command, kind, action
            ),
            SessionEventKind::Unmatched { text } => write!(f, "'{}' matched nothing", text),
            SessionEventKind::IgnoredWhilePaused { text } => write!(f, "'{}' ignored (paused)", text),
            SessionEventKind::DispatchFailed {
                text,
                action,
                error,
            } => write!(f, "'{}' -> {} failed: {}", text, action, error),
            SessionEventKind::TimerRelease { button } => write!(f, "released {}", button),
        }
    }
}

/// Why the listening loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitReason {
    #[default]
    StopRequested,
    /// Every text producer hung up
    InputClosed,
}

/// Counters and cleanup result returned when a session stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub profile: String,
    pub received: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub ignored_while_paused: u64,
    pub failed: u64,
    pub timer_releases: u64,
    /// Text still queued when the session stopped
    pub discarded_on_stop: u64,
    pub exit_reason: ExitReason,
    pub shutdown: ShutdownSummary,
}
