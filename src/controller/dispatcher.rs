//! Action dispatcher: the controller state machine
//!
//! Turns validated [`ControllerAction`]s into sink calls while tracking each
//! button's phase and each axis' last value.
//!
//! # Button state machine
//!
//! ```text
//!              hold                        tap
//!   Released ───────► PressedHeld   Released ─────► PressedTimed
//!      ▲    ◄───────      │  ▲         ▲   ◄───────      │
//!      │     release      │  │ hold    │  release/timer  │
//!      │                  │  └─────────┼─────────────────┘
//!      └──────────────────┴── shutdown ┘
//! ```
//!
//! The dispatcher has a single owner and every operation, including timer
//! firings, goes through `&mut self`. Operations on the same button therefore
//! never interleave.
//!
//! # Sink failures
//!
//! A failed sink call marks the sink unavailable and returns
//! [`DispatchError::ControllerUnavailable`]. The logical state still records
//! the intended transition. Until [`ControllerSink::is_ready`] reports
//! recovery, new actions are rejected and tap releases that come due are
//! deferred. A release whose sink call failed is owed as well. Owed releases
//! are sent once the sink is back, or at shutdown. Failed presses and axis
//! sets are not retried.

use super::controller_state::{ButtonPhase, ControllerState};
use super::release_scheduler::{ReleaseScheduler, TimerFired};
use super::sink::{ControllerSink, SinkError};
use crate::mapping::{Axis, Button, ControllerAction};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Errors surfaced by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The sink failed, or has not recovered from an earlier failure
    #[error("controller unavailable: {0}")]
    ControllerUnavailable(String),

    /// Two events raced on one button; resolved last-writer-wins
    #[error("conflicting events on {0}, keeping the latest")]
    ConcurrentInputConflict(Button),
}

impl From<SinkError> for DispatchError {
    fn from(e: SinkError) -> Self {
        DispatchError::ControllerUnavailable(e.to_string())
    }
}

/// What a dispatch did to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    Pressed(Button),
    Tapped { button: Button, release_in: Duration },
    Released(Button),
    AxisSet { axis: Axis, value: f32 },
    /// Action had no effect (hold while held, release while released)
    Unchanged,
}

/// Summary of a shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub timers_cancelled: usize,
    pub buttons_released: Vec<Button>,
    pub axes_neutralized: Vec<Axis>,
    /// Sink calls that failed during cleanup
    pub failed_calls: usize,
}

pub struct ActionDispatcher {
    sink: Box<dyn ControllerSink>,
    state: ControllerState,
    scheduler: ReleaseScheduler,
    sink_available: bool,
    deferred_releases: BTreeSet<Button>,
}

impl ActionDispatcher {
    /// Creates a dispatcher whose tap timers report to `timer_tx`.
    pub fn new(sink: Box<dyn ControllerSink>, timer_tx: mpsc::Sender<TimerFired>) -> Self {
        info!("Creating action dispatcher for sink: {}", sink.name());
        Self {
            sink,
            state: ControllerState::default(),
            scheduler: ReleaseScheduler::new(timer_tx),
            sink_available: true,
            deferred_releases: BTreeSet::new(),
        }
    }

    /// Read-only copy of the logical state
    pub fn snapshot(&self) -> ControllerState {
        self.state.clone()
    }

    pub fn phase(&self, button: Button) -> ButtonPhase {
        self.state.phase(button)
    }

    pub fn pending_releases(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub fn is_sink_available(&self) -> bool {
        self.sink_available
    }

    /// Applies one action.
    pub fn dispatch(&mut self, action: &ControllerAction) -> Result<DispatchOutcome, DispatchError> {
        self.ensure_available()?;
        debug!("Dispatching: {}", action);

        match *action {
            ControllerAction::Tap {
                button,
                duration_ms,
            } => {
                self.scheduler.cancel(button);
                self.state.set_phase(button, ButtonPhase::PressedTimed);
                let pressed = self.sink.press(button);
                // scheduled even if the press failed so the release is not lost
                let release_in = Duration::from_millis(duration_ms);
                self.scheduler.schedule(button, release_in);
                self.check(pressed)?;
                Ok(DispatchOutcome::Tapped { button, release_in })
            }
            ControllerAction::Hold { button } => {
                if self.state.phase(button) == ButtonPhase::PressedHeld {
                    debug!("{} already held", button);
                    return Ok(DispatchOutcome::Unchanged);
                }
                self.scheduler.cancel(button);
                self.state.set_phase(button, ButtonPhase::PressedHeld);
                let pressed = self.sink.press(button);
                self.check(pressed)?;
                Ok(DispatchOutcome::Pressed(button))
            }
            ControllerAction::Release { button } => {
                if !self.state.phase(button).is_pressed() {
                    debug!("{} already released", button);
                    return Ok(DispatchOutcome::Unchanged);
                }
                self.scheduler.cancel(button);
                self.state.set_phase(button, ButtonPhase::Released);
                self.release_or_defer(button)?;
                Ok(DispatchOutcome::Released(button))
            }
            ControllerAction::Analog { axis, value } => {
                if self.state.set_axis(axis, value) == Some(value) {
                    debug!("{} already at {:.2}, sending again", axis, value);
                }
                let set = self.sink.set_axis(axis, value);
                self.check(set)?;
                Ok(DispatchOutcome::AxisSet { axis, value })
            }
        }
    }

    /// Handles a release timer firing.
    ///
    /// Returns the released button, or `None` for a stale firing.
    pub fn on_timer_fired(&mut self, fired: TimerFired) -> Result<Option<Button>, DispatchError> {
        if !self.scheduler.take_fired(&fired) {
            debug!(
                "Dropping stale release timer (generation {}): {}",
                fired.generation,
                DispatchError::ConcurrentInputConflict(fired.button)
            );
            return Ok(None);
        }

        let button = fired.button;
        self.state.set_phase(button, ButtonPhase::Released);

        if !self.sink_available && !self.try_recover() {
            warn!("Sink unavailable, deferring release of {}", button);
            self.deferred_releases.insert(button);
            return Ok(Some(button));
        }

        debug!("Tap release of {}", button);
        self.release_or_defer(button)?;
        Ok(Some(button))
    }

    /// Cancels all timers, then releases every pressed button and zeroes
    /// every axis that was set.
    ///
    /// Sink calls are attempted even when the sink is marked unavailable;
    /// failures are counted, not returned.
    pub fn shutdown(&mut self) -> ShutdownSummary {
        info!("Shutting down dispatcher");
        let mut summary = ShutdownSummary {
            timers_cancelled: self.scheduler.cancel_all(),
            ..Default::default()
        };

        let mut to_release: BTreeSet<Button> = self.state.pressed_buttons().into_iter().collect();
        to_release.extend(std::mem::take(&mut self.deferred_releases));

        for button in to_release {
            if let Err(e) = self.sink.release(button) {
                error!("Failed to release {} during shutdown: {}", button, e);
                summary.failed_calls += 1;
            }
            summary.buttons_released.push(button);
        }

        for axis in self.state.touched_axes() {
            if let Err(e) = self.sink.set_axis(axis, 0.0) {
                error!("Failed to neutralize {} during shutdown: {}", axis, e);
                summary.failed_calls += 1;
            }
            summary.axes_neutralized.push(axis);
        }

        self.state.clear();
        info!(
            "Dispatcher stopped: {} timers cancelled, {} buttons released, {} axes neutralized",
            summary.timers_cancelled,
            summary.buttons_released.len(),
            summary.axes_neutralized.len()
        );
        summary
    }

    fn ensure_available(&mut self) -> Result<(), DispatchError> {
        if self.sink_available || self.try_recover() {
            Ok(())
        } else {
            Err(DispatchError::ControllerUnavailable(format!(
                "{} has not recovered",
                self.sink.name()
            )))
        }
    }

    /// Polls the sink and flushes deferred releases once it is back.
    fn try_recover(&mut self) -> bool {
        if !self.sink.is_ready() {
            return false;
        }
        info!("Sink {} recovered", self.sink.name());
        self.sink_available = true;

        let owed: Vec<Button> = self.deferred_releases.iter().copied().collect();
        for button in owed {
            if self.state.phase(button).is_pressed() {
                // pressed again, nothing owed
                self.deferred_releases.remove(&button);
                continue;
            }
            if let Err(e) = self.sink.release(button) {
                warn!("Deferred release of {} failed: {}", button, e);
                self.sink_available = false;
                return false;
            }
            self.deferred_releases.remove(&button);
            debug!("Sent deferred release of {}", button);
        }
        true
    }

    /// Sends a release; on failure the release stays owed to the sink and is
    /// sent on recovery or at shutdown.
    fn release_or_defer(&mut self, button: Button) -> Result<(), DispatchError> {
        let released = self.sink.release(button);
        if released.is_err() {
            self.deferred_releases.insert(button);
        }
        self.check(released)
    }

    pub fn deferred_releases(&self) -> Vec<Button> {
        self.deferred_releases.iter().copied().collect()
    }

    fn check(&mut self, result: Result<(), SinkError>) -> Result<(), DispatchError> {
        result.map_err(|e| {
            error!("Sink {} failed: {}", self.sink.name(), e);
            self.sink_available = false;
            DispatchError::from(e)
        })
    }
}
