//! Logical controller state owned by the dispatcher

use crate::mapping::{Axis, Button};
use std::collections::HashMap;

/// Per-button phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonPhase {
    #[default]
    Released,
    /// Pressed until an explicit release
    PressedHeld,
    /// Pressed until its scheduled release fires
    PressedTimed,
}

impl ButtonPhase {
    pub fn is_pressed(&self) -> bool {
        !matches!(self, ButtonPhase::Released)
    }
}

/// Buttons and axes as the dispatcher last intended them
///
/// Buttons absent from the map are released; axes absent from the map are
/// neutral (0.0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    buttons: HashMap<Button, ButtonPhase>,
    axes: HashMap<Axis, f32>,
}

impl ControllerState {
    pub fn phase(&self, button: Button) -> ButtonPhase {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, button: Button, phase: ButtonPhase) {
        if phase == ButtonPhase::Released {
            self.buttons.remove(&button);
        } else {
            self.buttons.insert(button, phase);
        }
    }

    pub fn axis(&self, axis: Axis) -> f32 {
        self.axes.get(&axis).copied().unwrap_or(0.0)
    }

    /// Records an axis value, returning the previous one if it was set
    pub(crate) fn set_axis(&mut self, axis: Axis, value: f32) -> Option<f32> {
        self.axes.insert(axis, value)
    }

    /// Pressed buttons in a stable order
    pub fn pressed_buttons(&self) -> Vec<Button> {
        let mut pressed: Vec<Button> = self.buttons.keys().copied().collect();
        pressed.sort();
        pressed
    }

    /// Axes that were ever set, in a stable order
    pub fn touched_axes(&self) -> Vec<Axis> {
        let mut axes: Vec<Axis> = self.axes.keys().copied().collect();
        axes.sort();
        axes
    }

    /// True when no button is pressed and every axis is at 0.0
    pub fn is_neutral(&self) -> bool {
        self.buttons.is_empty() && self.axes.values().all(|v| *v == 0.0)
    }

    pub(crate) fn clear(&mut self) {
        self.buttons.clear();
        self.axes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_neutral() {
        let state = ControllerState::default();
        assert_eq!(state.phase(Button::A), ButtonPhase::Released);
        assert_eq!(state.axis(Axis::RightTrigger), 0.0);
        assert!(state.is_neutral());
    }

    #[test]
    fn test_phase_and_axis_tracking() {
        let mut state = ControllerState::default();
        state.set_phase(Button::B, ButtonPhase::PressedHeld);
        state.set_phase(Button::A, ButtonPhase::PressedTimed);
        assert_eq!(state.pressed_buttons(), vec![Button::A, Button::B]);
        assert!(!state.is_neutral());

        state.set_phase(Button::A, ButtonPhase::Released);
        state.set_phase(Button::B, ButtonPhase::Released);
        assert!(state.pressed_buttons().is_empty());

        assert_eq!(state.set_axis(Axis::LeftStickX, -0.5), None);
        assert_eq!(state.set_axis(Axis::LeftStickX, -0.5), Some(-0.5));
        assert!(!state.is_neutral());
        state.set_axis(Axis::LeftStickX, 0.0);
        assert!(state.is_neutral());
        assert_eq!(state.touched_axes(), vec![Axis::LeftStickX]);
    }
}
