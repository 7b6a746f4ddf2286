//! Voice mappings: what a phrase does to the controller
//!
//! Contains the mapping table types, profile handling and the input matcher.
//!
//! # Architecture
//!
//! ```text
//! Profile file ──► RawProfileDocument ──► [validate each record] ──► Profile
//!                                                │
//!                                      rejected ─┘ (MappingError per index)
//!
//! recognized text ──► InputMatcher::find(text, &Profile) ──► Option<MatchResult>
//! ```
//!
//! Profiles are immutable while a listening session runs; the session holds
//! them behind an `Arc`.

pub mod error;
pub mod mapping_types;
pub mod matcher;
pub mod profile;

// Re-exports for easier access
pub use error::{InvalidReason, MappingError};
pub use mapping_types::{
    normalize_phrase, ActionType, Axis, Button, ControllerAction, InputId, Mapping, MappingRecord,
};
pub use matcher::{match_text, ContainmentTieBreak, InputMatcher, MatchKind, MatchPolicy, MatchResult};
pub use profile::{LoadedProfile, Profile, ProfileDocument, RawProfileDocument, DEFAULT_PROFILE_NAME};
