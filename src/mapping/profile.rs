//! Profiles: named, ordered collections of mappings
//!
//! A profile is parsed leniently. Each `[[mappings]]` entry is first read as
//! a raw TOML value and then validated on its own, so one bad entry is
//! reported with its index while the remaining mappings still load.

use crate::mapping::error::{InvalidReason, MappingError};
use crate::mapping::mapping_types::{Axis, Button, ControllerAction, Mapping, MappingRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Name of the starter profile
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Named ordered collection of mappings
///
/// Order matters: the matcher breaks ties by profile order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: String,
    pub mappings: Vec<Mapping>,
}

/// Result of building a profile from a document
#[derive(Debug, Clone)]
pub struct LoadedProfile {
    pub profile: Profile,
    /// One entry per rejected mapping, in document order
    pub rejected: Vec<MappingError>,
}

/// Profile as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub name: String,
    #[serde(default)]
    pub mappings: Vec<MappingRecord>,
}

/// Profile as read from disk, before per-mapping validation
#[derive(Debug, Clone, Deserialize)]
pub struct RawProfileDocument {
    pub name: String,
    #[serde(default)]
    pub mappings: Vec<toml::Value>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
        }
    }

    pub fn add_mapping(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    /// Removes the mapping at `index`; returns false when out of range.
    pub fn remove_mapping(&mut self, index: usize) -> bool {
        if index < self.mappings.len() {
            self.mappings.remove(index);
            true
        } else {
            false
        }
    }

    /// Replaces the mapping at `index`; returns false when out of range.
    pub fn update_mapping(&mut self, index: usize, mapping: Mapping) -> bool {
        match self.mappings.get_mut(index) {
            Some(slot) => {
                *slot = mapping;
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn to_document(&self) -> ProfileDocument {
        ProfileDocument {
            name: self.name.clone(),
            mappings: self.mappings.iter().map(MappingRecord::from).collect(),
        }
    }

    /// Validates every mapping record, keeping the valid ones in order.
    pub fn from_records(name: impl Into<String>, records: Vec<MappingRecord>) -> LoadedProfile {
        let raw = records
            .into_iter()
            .map(|record| toml::Value::try_from(record).map_err(|e| e.to_string()))
            .collect::<Vec<_>>();
        build(name.into(), raw)
    }

    pub fn from_raw_document(document: RawProfileDocument) -> LoadedProfile {
        let raw = document.mappings.into_iter().map(Ok).collect();
        build(document.name, raw)
    }

    /// Starter profile created when no profile exists yet
    pub fn default_profile() -> Self {
        use ControllerAction::*;

        let tap = |button, duration_ms| Tap {
            button,
            duration_ms,
        };
        let bindings = [
            ("jump", tap(Button::A, 200)),
            ("attack", tap(Button::X, 200)),
            ("block", Hold { button: Button::B }),
            ("release block", Release { button: Button::B }),
            ("menu", tap(Button::Start, 200)),
            ("up", tap(Button::DPadUp, 200)),
            ("down", tap(Button::DPadDown, 200)),
            ("left", tap(Button::DPadLeft, 200)),
            ("right", tap(Button::DPadRight, 200)),
            ("hold up", Hold { button: Button::DPadUp }),
            ("hold down", Hold { button: Button::DPadDown }),
            ("hold left", Hold { button: Button::DPadLeft }),
            ("hold right", Hold { button: Button::DPadRight }),
            ("release up", Release { button: Button::DPadUp }),
            ("release down", Release { button: Button::DPadDown }),
            ("release left", Release { button: Button::DPadLeft }),
            ("release right", Release { button: Button::DPadRight }),
            ("long up", tap(Button::DPadUp, 800)),
            ("long down", tap(Button::DPadDown, 800)),
            ("long left", tap(Button::DPadLeft, 800)),
            ("long right", tap(Button::DPadRight, 800)),
            ("walk left", Analog { axis: Axis::LeftStickX, value: -0.5 }),
            ("walk right", Analog { axis: Axis::LeftStickX, value: 0.5 }),
            ("run left", Analog { axis: Axis::LeftStickX, value: -1.0 }),
            ("run right", Analog { axis: Axis::LeftStickX, value: 1.0 }),
            ("stop", Analog { axis: Axis::LeftStickX, value: 0.0 }),
        ];

        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            mappings: bindings
                .into_iter()
                .map(|(voice_command, action)| Mapping {
                    voice_command: voice_command.to_string(),
                    action,
                })
                .collect(),
        }
    }
}

fn build(name: String, raw: Vec<Result<toml::Value, String>>) -> LoadedProfile {
    let mut profile = Profile::new(name);
    let mut rejected = Vec::new();

    for (index, value) in raw.into_iter().enumerate() {
        let voice_command = value
            .as_ref()
            .ok()
            .and_then(|v| v.get("voice_command"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let result = value
            .map_err(InvalidReason::Malformed)
            .and_then(|v| {
                v.try_into::<MappingRecord>()
                    .map_err(|e| InvalidReason::Malformed(e.to_string()))
            })
            .and_then(|record| record.validate());

        match result {
            Ok(mapping) => {
                debug!("Loaded mapping #{}: {}", index, mapping);
                profile.mappings.push(mapping);
            }
            Err(reason) => {
                let error = MappingError::InvalidMapping {
                    index,
                    voice_command,
                    reason,
                };
                warn!("Profile '{}': {}", profile.name, error);
                rejected.push(error);
            }
        }
    }

    LoadedProfile { profile, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = Profile::default_profile();
        assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
        assert_eq!(profile.mappings.len(), 26);

        for mapping in &profile.mappings {
            let record = MappingRecord::from(mapping);
            assert_eq!(record.validate().as_ref(), Ok(mapping));
        }
    }

    #[test]
    fn test_invalid_mappings_rejected_individually() {
        let document: RawProfileDocument = toml::from_str(
            r#"
            name = "mixed"

            [[mappings]]
            voice_command = "jump"
            target_input = "a"
            action_type = "tap"
            duration_ms = 200

            [[mappings]]
            voice_command = "push"
            target_input = "left_stick_x"
            action_type = "analog"
            analog_value = 2.0

            [[mappings]]
            target_input = "b"
            action_type = "hold"

            [[mappings]]
            voice_command = "block"
            target_input = "b"
            action_type = "hold"
            "#,
        )
        .unwrap();

        let loaded = Profile::from_raw_document(document);
        assert_eq!(loaded.profile.name, "mixed");
        let commands: Vec<_> = loaded
            .profile
            .mappings
            .iter()
            .map(|m| m.voice_command.as_str())
            .collect();
        assert_eq!(commands, vec!["jump", "block"]);

        assert_eq!(loaded.rejected.len(), 2);
        assert!(matches!(
            &loaded.rejected[0],
            MappingError::InvalidMapping { index: 1, voice_command, reason: InvalidReason::AnalogOutOfRange(_) }
                if voice_command == "push"
        ));
        assert!(matches!(
            &loaded.rejected[1],
            MappingError::InvalidMapping { index: 2, reason: InvalidReason::Malformed(_), .. }
        ));
    }

    #[test]
    fn test_edit_helpers() {
        let mut profile = Profile::new("edit");
        let jump = Mapping::new(
            "jump",
            ControllerAction::Tap {
                button: Button::A,
                duration_ms: 200,
            },
        )
        .unwrap();
        let fire = Mapping::new("fire", ControllerAction::Hold { button: Button::RightBumper }).unwrap();

        profile.add_mapping(jump.clone());
        assert!(profile.update_mapping(0, fire.clone()));
        assert_eq!(profile.mappings, vec![fire]);
        assert!(!profile.update_mapping(5, jump));
        assert!(!profile.remove_mapping(1));
        assert!(profile.remove_mapping(0));
        assert!(profile.is_empty());
    }

    #[test]
    fn test_document_roundtrip_keeps_order() {
        let profile = Profile::default_profile();
        let text = toml::to_string_pretty(&profile.to_document()).unwrap();
        let raw: RawProfileDocument = toml::from_str(&text).unwrap();
        let loaded = Profile::from_raw_document(raw);
        assert!(loaded.rejected.is_empty());
        assert_eq!(loaded.profile, profile);
    }
}
