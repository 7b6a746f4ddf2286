//! Controller sink: the virtual gamepad driver seen from the dispatcher
//!
//! The dispatcher only knows the [`ControllerSink`] trait. Real driver
//! bindings implement it outside this crate; [`VirtualPad`] is an in-process
//! pad that tracks its own state and logs every call, used by the binary when
//! no driver is attached.

use crate::mapping::{Axis, Button};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

/// Errors reported by a sink implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Driver not installed, device unplugged, bus not ready
    #[error("controller not ready: {0}")]
    NotReady(String),

    #[error("driver error: {0}")]
    Driver(String),
}

/// Primitive controller output
///
/// Calls come from a single owner (the dispatcher) and are never issued
/// concurrently, so implementations take `&mut self`.
pub trait ControllerSink: Send + 'static {
    fn press(&mut self, button: Button) -> Result<(), SinkError>;

    fn release(&mut self, button: Button) -> Result<(), SinkError>;

    /// Sets an axis; sticks use `[-1.0, 1.0]`, triggers `[0.0, 1.0]`
    fn set_axis(&mut self, axis: Axis, value: f32) -> Result<(), SinkError>;

    /// Polled by the dispatcher after a failure to detect recovery
    fn is_ready(&mut self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "controller"
    }
}

/// In-process virtual pad that logs its output
#[derive(Debug, Default)]
pub struct VirtualPad {
    pressed: BTreeSet<Button>,
    axes: BTreeMap<Axis, f32>,
}

impl VirtualPad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }

    pub fn axis(&self, axis: Axis) -> f32 {
        self.axes.get(&axis).copied().unwrap_or(0.0)
    }

    fn summary(&self) -> String {
        let buttons: Vec<_> = self.pressed.iter().map(Button::id).collect();
        let axes: Vec<_> = self
            .axes
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|(a, v)| format!("{}={:.2}", a, v))
            .collect();
        format!("buttons:[{}] axes:[{}]", buttons.join(","), axes.join(","))
    }
}

impl ControllerSink for VirtualPad {
    fn press(&mut self, button: Button) -> Result<(), SinkError> {
        self.pressed.insert(button);
        info!("Pad press {} -> {}", button, self.summary());
        Ok(())
    }

    fn release(&mut self, button: Button) -> Result<(), SinkError> {
        self.pressed.remove(&button);
        info!("Pad release {} -> {}", button, self.summary());
        Ok(())
    }

    fn set_axis(&mut self, axis: Axis, value: f32) -> Result<(), SinkError> {
        // Triggers only travel one way
        let value = if axis.is_trigger() {
            value.clamp(0.0, 1.0)
        } else {
            value.clamp(-1.0, 1.0)
        };
        self.axes.insert(axis, value);
        info!("Pad axis {} -> {}", axis, self.summary());
        Ok(())
    }

    fn name(&self) -> &str {
        "virtual pad"
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording sink shared by dispatcher and session tests

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum SinkCall {
        Press(Button),
        Release(Button),
        SetAxis(Axis, f32),
    }

    /// Records every successful call; `failing` makes calls error out
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSink {
        pub calls: Arc<Mutex<Vec<SinkCall>>>,
        pub failing: Arc<AtomicBool>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn record(&self, call: SinkCall) -> Result<(), SinkError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SinkError::NotReady("bus offline".to_string()));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl ControllerSink for RecordingSink {
        fn press(&mut self, button: Button) -> Result<(), SinkError> {
            self.record(SinkCall::Press(button))
        }

        fn release(&mut self, button: Button) -> Result<(), SinkError> {
            self.record(SinkCall::Release(button))
        }

        fn set_axis(&mut self, axis: Axis, value: f32) -> Result<(), SinkError> {
            self.record(SinkCall::SetAxis(axis, value))
        }

        fn is_ready(&mut self) -> bool {
            !self.failing.load(Ordering::SeqCst)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }
}
