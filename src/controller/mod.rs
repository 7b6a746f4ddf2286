//! Controller subsystem: from validated actions to virtual gamepad calls
//!
//! 1. [`dispatcher`] - Button/axis state machine and sink failure handling
//! 2. [`release_scheduler`] - Cancellable timed releases for taps
//! 3. [`controller_state`] - Logical state owned by the dispatcher
//! 4. [`sink`] - Output trait and the logging virtual pad
//!
//! # Architecture
//!
//! ```text
//! ControllerAction ──► ActionDispatcher ──► ControllerSink
//!                          │      ▲
//!                 schedule │      │ TimerFired (via session)
//!                          ▼      │
//!                     ReleaseScheduler
//! ```

pub mod controller_state;
pub mod dispatcher;
pub mod release_scheduler;
pub mod sink;

pub use controller_state::{ButtonPhase, ControllerState};
pub use dispatcher::{ActionDispatcher, DispatchError, DispatchOutcome, ShutdownSummary};
pub use release_scheduler::{PendingRelease, ReleaseScheduler, TimerFired};
pub use sink::{ControllerSink, SinkError, VirtualPad};
