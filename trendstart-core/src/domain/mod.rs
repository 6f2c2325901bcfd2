//! Domain types for the trend-start engine.

pub mod bar;
pub mod event;

pub use bar::{Bar, BarError};
pub use event::{DowntrendRule, EventDetails, RuleType, SignalType, TrendEvent, UptrendRule};
