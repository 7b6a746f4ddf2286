//! # Persistence Module
//!
//! Profiles live as one TOML document per profile:
//!
//! ```toml
//! name = "default"
//!
//! [[mappings]]
//! voice_command = "jump"
//! target_input = "a"
//! action_type = "tap"
//! duration_ms = 200
//! ```
//!
//! ## Error Handling Strategy
//! File operations return `color_eyre` reports with context. Broken mappings
//! inside a readable file are not errors; they are listed in
//! [`LoadedProfile::rejected`](crate::mapping::LoadedProfile) and the rest of
//! the profile loads.

pub mod profile_store;

pub use profile_store::{pick_profile, validate_profile_name, ProfileStore};
