//! Error definitions for the mapping module

use crate::mapping::mapping_types::ActionType;
use thiserror::Error;

/// Why a single mapping record was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidReason {
    #[error("voice command is empty")]
    EmptyVoiceCommand,

    #[error("unknown target input: {0}")]
    UnknownTarget(String),

    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("tap requires duration_ms")]
    MissingDuration,

    #[error("duration_ms must be positive, got {0}")]
    NonPositiveDuration(i64),

    #[error("duration_ms is only allowed for tap, not {0}")]
    UnexpectedDuration(ActionType),

    #[error("analog requires analog_value")]
    MissingAnalogValue,

    #[error("analog_value must be within [-1.0, 1.0], got {0}")]
    AnalogOutOfRange(f64),

    #[error("analog_value is only allowed for analog, not {0}")]
    UnexpectedAnalogValue(ActionType),

    /// Button actions on an axis, or analog on a button
    #[error("{action_type} cannot target {target}")]
    TargetKindMismatch {
        action_type: ActionType,
        target: String,
    },

    /// Record could not be read at all (missing field, wrong type)
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Errors raised while building or editing profiles
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// One mapping of a profile failed validation
    ///
    /// Only this mapping is dropped; the rest of the profile stays usable.
    #[error("invalid mapping #{index} ('{voice_command}'): {reason}")]
    InvalidMapping {
        index: usize,
        voice_command: String,
        reason: InvalidReason,
    },

    #[error("invalid profile name: '{0}'")]
    InvalidProfileName(String),
}
