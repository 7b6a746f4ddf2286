//! Input matcher: recognized text → mapping
//!
//! # Matching order
//!
//! ```text
//! text ──► normalize ──► exact match? ──yes──► first exact mapping (profile order)
//!                              │
//!                              no
//!                              ▼
//!                  whole-word containment ──► tie-break policy ──► mapping
//! ```
//!
//! Recognizers tend to wrap a command in filler words ("I say jump now"), so
//! containment is on by default. Containment is checked on word boundaries:
//! "up" matches "go up now" but not "upgrade".

use crate::mapping::mapping_types::{normalize_phrase, Mapping};
use crate::mapping::profile::Profile;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How to choose between several containment matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentTieBreak {
    /// First matching mapping in profile order
    #[default]
    ProfileOrder,
    /// Mapping with the most words, then profile order
    LongestCommand,
}

/// Matcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    pub allow_containment: bool,
    pub tie_break: ContainmentTieBreak,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            allow_containment: true,
            tie_break: ContainmentTieBreak::ProfileOrder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Contained,
}

/// A successful match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'p> {
    pub mapping: &'p Mapping,
    /// Position of the mapping inside the profile
    pub index: usize,
    pub kind: MatchKind,
}

/// Stateless matcher; holds only its policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputMatcher {
    policy: MatchPolicy,
}

impl InputMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Finds the mapping for `text`, or `None` when nothing applies.
    pub fn find<'p>(&self, text: &str, profile: &'p Profile) -> Option<MatchResult<'p>> {
        let text = normalize_phrase(text);
        if text.is_empty() || profile.mappings.is_empty() {
            return None;
        }

        if let Some((index, mapping)) = profile
            .mappings
            .iter()
            .enumerate()
            .find(|(_, m)| m.voice_command == text)
        {
            debug!("Exact match: '{}' -> {}", text, mapping);
            return Some(MatchResult {
                mapping,
                index,
                kind: MatchKind::Exact,
            });
        }

        if !self.policy.allow_containment {
            debug!("No exact match for '{}'", text);
            return None;
        }

        let words: Vec<&str> = text.split(' ').collect();
        let mut candidates = profile
            .mappings
            .iter()
            .enumerate()
            .filter(|(_, m)| contains_words(&words, &m.voice_command));

        let found = match self.policy.tie_break {
            ContainmentTieBreak::ProfileOrder => candidates.next(),
            // max_by_key keeps the last maximum, so compare on (words, Reverse(index))
            ContainmentTieBreak::LongestCommand => candidates
                .max_by_key(|(index, m)| (m.word_count(), std::cmp::Reverse(*index))),
        };

        match found {
            Some((index, mapping)) => {
                debug!("Containment match: '{}' contains {}", text, mapping);
                Some(MatchResult {
                    mapping,
                    index,
                    kind: MatchKind::Contained,
                })
            }
            None => {
                debug!("No match for '{}'", text);
                None
            }
        }
    }
}

/// Convenience wrapper using the default policy
pub fn match_text<'p>(text: &str, profile: &'p Profile) -> Option<&'p Mapping> {
    InputMatcher::default()
        .find(text, profile)
        .map(|result| result.mapping)
}

/// True if `phrase` occurs in `words` as a contiguous word sequence.
fn contains_words(words: &[&str], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split(' ').collect();
    if phrase.is_empty() || phrase.len() > words.len() {
        return false;
    }
    words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::mapping_types::{Axis, Button, ControllerAction};

    fn profile() -> Profile {
        let mut profile = Profile::new("test");
        let tap = |button| ControllerAction::Tap {
            button,
            duration_ms: 200,
        };
        for (command, action) in [
            ("jump", tap(Button::A)),
            ("attack", tap(Button::X)),
            ("up", tap(Button::DPadUp)),
            ("hold up", ControllerAction::Hold { button: Button::DPadUp }),
            (
                "walk left",
                ControllerAction::Analog {
                    axis: Axis::LeftStickX,
                    value: -0.5,
                },
            ),
        ] {
            profile.add_mapping(Mapping::new(command, action).unwrap());
        }
        profile
    }

    #[test]
    fn test_exact_match() {
        let profile = profile();
        let result = InputMatcher::default().find("jump", &profile).unwrap();
        assert_eq!(result.mapping.voice_command, "jump");
        assert_eq!(result.kind, MatchKind::Exact);
        assert_eq!(result.index, 0);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let profile = profile();
        let mapping = match_text("  JUMP  ", &profile).unwrap();
        assert_eq!(mapping.voice_command, "jump");
    }

    #[test]
    fn test_containment_match() {
        let profile = profile();
        let result = InputMatcher::default().find("I say jump now", &profile).unwrap();
        assert_eq!(result.mapping.voice_command, "jump");
        assert_eq!(result.kind, MatchKind::Contained);
    }

    #[test]
    fn test_whole_word_only() {
        let profile = profile();
        assert!(match_text("jumping", &profile).is_none());
        assert!(match_text("upgrade", &profile).is_none());
        assert!(match_text("walk leftwards", &profile).is_none());
    }

    #[test]
    fn test_exact_preferred_over_earlier_containment() {
        // "up" comes before "hold up" but "hold up" is exact
        let profile = profile();
        let result = InputMatcher::default().find("hold up", &profile).unwrap();
        assert_eq!(result.mapping.voice_command, "hold up");
        assert_eq!(result.kind, MatchKind::Exact);
    }

    #[test]
    fn test_tie_break_policies() {
        let profile = profile();

        let first = InputMatcher::default().find("please hold up", &profile).unwrap();
        assert_eq!(first.mapping.voice_command, "up");

        let longest = InputMatcher::new(MatchPolicy {
            allow_containment: true,
            tie_break: ContainmentTieBreak::LongestCommand,
        })
        .find("please hold up", &profile)
        .unwrap();
        assert_eq!(longest.mapping.voice_command, "hold up");
    }

    #[test]
    fn test_longest_command_ties_keep_profile_order() {
        let profile = profile();
        let matcher = InputMatcher::new(MatchPolicy {
            allow_containment: true,
            tie_break: ContainmentTieBreak::LongestCommand,
        });
        let result = matcher.find("jump then attack", &profile).unwrap();
        assert_eq!(result.mapping.voice_command, "jump");
    }

    #[test]
    fn test_containment_disabled() {
        let profile = profile();
        let matcher = InputMatcher::new(MatchPolicy {
            allow_containment: false,
            ..MatchPolicy::default()
        });
        assert!(matcher.find("I say jump now", &profile).is_none());
        assert!(matcher.find("jump", &profile).is_some());
    }

    #[test]
    fn test_no_match_and_empty_inputs() {
        let profile = profile();
        assert!(match_text("dance", &profile).is_none());
        assert!(match_text("", &profile).is_none());
        assert!(match_text("   ", &profile).is_none());
        assert!(match_text("jump", &Profile::new("empty")).is_none());
    }

    #[test]
    fn test_match_is_repeatable() {
        let profile = profile();
        let before = profile.clone();
        let matcher = InputMatcher::default();
        for text in ["jump", "I say walk left", "nothing here", "hold up"] {
            assert_eq!(matcher.find(text, &profile), matcher.find(text, &profile));
        }
        assert_eq!(profile, before);
    }
}
