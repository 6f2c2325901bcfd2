//! Confirmation rule batteries.
//!
//! Each battery is an ordered list of named predicates; the first match wins
//! and names the rule on the emitted event. Evaluation is pure — candidates
//! are taken as snapshots and no rule mutates state. Missing candidates are
//! a typed no-match, never an error.

pub mod cds;
pub mod cus;

pub(crate) use cds::evaluate_downtrend_rules;
pub(crate) use cus::evaluate_uptrend_rules;

/// Maximum distance (in bars) between an uptrend candidate and the bar that
/// confirms it by exhaustion reversal.
pub const EXHAUSTION_MAX_BARS_FROM_CANDIDATE: usize = 6;
