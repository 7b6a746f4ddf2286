//! voicepad: spoken commands to virtual gamepad input
//!
//! ```text
//! speech ──► session ──► matcher ──► dispatcher ──► ControllerSink
//!                                        │  ▲
//!                                        ▼  │
//!                                  release timers
//! ```

pub mod config;
pub mod controller;
pub mod mapping;
pub mod persistence;
pub mod session;
pub mod speech;
