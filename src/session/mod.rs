//! Listening sessions
//!
//! A session connects a recognized-text source to the controller:
//!
//! 1. [`voice_session`] - Typestate session owning matcher and dispatcher
//! 2. [`session_handle`] - Task spawning, stop and reporting
//! 3. [`events`] - Events, status and the final report
//!
//! ```text
//! speech source ──[String]──► VoiceSession ──► ControllerSink
//!                                  │
//!                                  ├──► SessionEvent (mpsc, lossy)
//!                                  └──► SessionStatus (watch)
//! ```

pub mod events;
pub mod session_handle;
pub mod voice_session;

pub use events::{ExitReason, SessionEvent, SessionEventKind, SessionReport, SessionStatus};
pub use session_handle::{SessionError, SessionHandle, SessionSettings};
pub use voice_session::VoiceSession;
