//! Shared data types for voice mappings
//!
//! Defines the controller identifiers a mapping can target, the validated
//! [`Mapping`] used at runtime and the [`MappingRecord`] persisted in
//! profile files. Records go through [`MappingRecord::validate`] and
//! [`Mapping::new`] checks the action and normalizes the phrase. A `Mapping`
//! built as a struct literal skips those checks, so in-crate presets such as
//! the starter profile must already use normalized phrases and in-range
//! values.

use crate::mapping::error::InvalidReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digital buttons of the virtual pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Start,
    Back,
    LeftStick,
    RightStick,
    Guide,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

impl Button {
    pub const ALL: [Button; 15] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::LeftBumper,
        Button::RightBumper,
        Button::Start,
        Button::Back,
        Button::LeftStick,
        Button::RightStick,
        Button::Guide,
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
    ];

    /// Identifier used in profile files
    pub fn id(&self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
            Button::LeftBumper => "lb",
            Button::RightBumper => "rb",
            Button::Start => "start",
            Button::Back => "back",
            Button::LeftStick => "ls",
            Button::RightStick => "rs",
            Button::Guide => "guide",
            Button::DPadUp => "dpad_up",
            Button::DPadDown => "dpad_down",
            Button::DPadLeft => "dpad_left",
            Button::DPadRight => "dpad_right",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Continuous axes of the virtual pad (sticks and triggers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::LeftStickX,
        Axis::LeftStickY,
        Axis::RightStickX,
        Axis::RightStickY,
        Axis::LeftTrigger,
        Axis::RightTrigger,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Axis::LeftStickX => "left_stick_x",
            Axis::LeftStickY => "left_stick_y",
            Axis::RightStickX => "right_stick_x",
            Axis::RightStickY => "right_stick_y",
            Axis::LeftTrigger => "left_trigger",
            Axis::RightTrigger => "right_trigger",
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, Axis::LeftTrigger | Axis::RightTrigger)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Any input a mapping can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    Button(Button),
    Axis(Axis),
}

impl FromStr for InputId {
    type Err = InvalidReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        if let Some(button) = Button::ALL.iter().find(|b| b.id() == id) {
            return Ok(InputId::Button(*button));
        }
        if let Some(axis) = Axis::ALL.iter().find(|a| a.id() == id) {
            return Ok(InputId::Axis(*axis));
        }
        Err(InvalidReason::UnknownTarget(s.to_string()))
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputId::Button(button) => write!(f, "{}", button),
            InputId::Axis(axis) => write!(f, "{}", axis),
        }
    }
}

/// The four kinds of controller actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Tap,
    Hold,
    Release,
    Analog,
}

impl ActionType {
    pub fn id(&self) -> &'static str {
        match self {
            ActionType::Tap => "tap",
            ActionType::Hold => "hold",
            ActionType::Release => "release",
            ActionType::Analog => "analog",
        }
    }
}

impl FromStr for ActionType {
    type Err = InvalidReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tap" => Ok(ActionType::Tap),
            "hold" => Ok(ActionType::Hold),
            "release" => Ok(ActionType::Release),
            "analog" => Ok(ActionType::Analog),
            _ => Err(InvalidReason::UnknownActionType(s.to_string())),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A validated controller action
///
/// Each variant carries exactly the data its action type needs, so a tap
/// always has a positive duration and an analog action always has a value
/// in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerAction {
    Tap { button: Button, duration_ms: u64 },
    Hold { button: Button },
    Release { button: Button },
    Analog { axis: Axis, value: f32 },
}

impl ControllerAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            ControllerAction::Tap { .. } => ActionType::Tap,
            ControllerAction::Hold { .. } => ActionType::Hold,
            ControllerAction::Release { .. } => ActionType::Release,
            ControllerAction::Analog { .. } => ActionType::Analog,
        }
    }

    pub fn target(&self) -> InputId {
        match self {
            ControllerAction::Tap { button, .. }
            | ControllerAction::Hold { button }
            | ControllerAction::Release { button } => InputId::Button(*button),
            ControllerAction::Analog { axis, .. } => InputId::Axis(*axis),
        }
    }
}

impl fmt::Display for ControllerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerAction::Tap {
                button,
                duration_ms,
            } => write!(f, "tap {} for {}ms", button, duration_ms),
            ControllerAction::Hold { button } => write!(f, "hold {}", button),
            ControllerAction::Release { button } => write!(f, "release {}", button),
            ControllerAction::Analog { axis, value } => write!(f, "set {} to {:.2}", axis, value),
        }
    }
}

/// A voice command bound to a controller action
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    /// Normalized phrase (see [`normalize_phrase`])
    pub voice_command: String,
    pub action: ControllerAction,
}

impl Mapping {
    /// Builds a mapping from parts, normalizing the phrase.
    ///
    /// Fails with the same reasons a persisted record would.
    pub fn new(voice_command: &str, action: ControllerAction) -> Result<Self, InvalidReason> {
        MappingRecord::from(&Mapping {
            voice_command: voice_command.to_string(),
            action,
        })
        .validate()
    }

    pub fn target(&self) -> InputId {
        self.action.target()
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }

    /// Number of words in the phrase
    pub fn word_count(&self) -> usize {
        self.voice_command.split_whitespace().count()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' -> {}", self.voice_command, self.action)
    }
}

/// Mapping as stored in a profile file
///
/// Field types are deliberately loose (strings, signed integers, `f64`) so a
/// bad value is reported as an [`InvalidReason`] instead of failing the
/// whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub voice_command: String,
    pub target_input: String,
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analog_value: Option<f64>,
}

impl MappingRecord {
    /// Checks the record and turns it into a runtime [`Mapping`].
    pub fn validate(&self) -> Result<Mapping, InvalidReason> {
        let voice_command = normalize_phrase(&self.voice_command);
        if voice_command.is_empty() {
            return Err(InvalidReason::EmptyVoiceCommand);
        }

        let target: InputId = self.target_input.parse()?;
        let action_type: ActionType = self.action_type.parse()?;

        if action_type == ActionType::Tap {
            match self.duration_ms {
                None => return Err(InvalidReason::MissingDuration),
                Some(ms) if ms <= 0 => return Err(InvalidReason::NonPositiveDuration(ms)),
                Some(_) => {}
            }
        } else if self.duration_ms.is_some() {
            return Err(InvalidReason::UnexpectedDuration(action_type));
        }

        if action_type == ActionType::Analog {
            match self.analog_value {
                None => return Err(InvalidReason::MissingAnalogValue),
                Some(v) if !(-1.0..=1.0).contains(&v) => {
                    return Err(InvalidReason::AnalogOutOfRange(v))
                }
                Some(_) => {}
            }
        } else if self.analog_value.is_some() {
            return Err(InvalidReason::UnexpectedAnalogValue(action_type));
        }

        let action = match (action_type, target) {
            (ActionType::Tap, InputId::Button(button)) => ControllerAction::Tap {
                button,
                // checked above
                duration_ms: self.duration_ms.unwrap_or_default() as u64,
            },
            (ActionType::Hold, InputId::Button(button)) => ControllerAction::Hold { button },
            (ActionType::Release, InputId::Button(button)) => ControllerAction::Release { button },
            (ActionType::Analog, InputId::Axis(axis)) => ControllerAction::Analog {
                axis,
                value: self.analog_value.unwrap_or_default() as f32,
            },
            (action_type, target) => {
                return Err(InvalidReason::TargetKindMismatch {
                    action_type,
                    target: target.to_string(),
                })
            }
        };

        Ok(Mapping {
            voice_command,
            action,
        })
    }
}

impl From<&Mapping> for MappingRecord {
    fn from(mapping: &Mapping) -> Self {
        let (duration_ms, analog_value) = match mapping.action {
            ControllerAction::Tap { duration_ms, .. } => (Some(duration_ms as i64), None),
            ControllerAction::Analog { value, .. } => (None, Some(value as f64)),
            _ => (None, None),
        };
        Self {
            voice_command: mapping.voice_command.clone(),
            target_input: mapping.target().to_string(),
            action_type: mapping.action_type().to_string(),
            duration_ms,
            analog_value,
        }
    }
}

/// Lower-cases, trims and collapses inner whitespace.
pub fn normalize_phrase(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
