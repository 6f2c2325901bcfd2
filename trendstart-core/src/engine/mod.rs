//! The trend state machine.

pub mod alternation;
pub mod containment;
pub mod debug;
pub mod event_loop;
pub mod rules;
pub mod state;

pub use containment::{Containment, ContainmentRef, CONTAINMENT_CONFIRM_GRACE_BARS};
pub use debug::{DebugContext, DebugRecord};
pub use event_loop::TrendEngine;
pub use state::{Candidate, EngineState, LastConfirmed, PendingMark, TrendDirection};
