//! Trendstart Core — causal trend-start detection over OHLC bar streams.
//!
//! This crate contains the detector itself:
//! - Domain types (bars, trend events, rule identifiers)
//! - Pure two-bar pattern predicates
//! - Pending-candidate bookkeeping with monotone replacement
//! - Containment tracking with confirmation suppression
//! - Ordered CUS/CDS confirmation rule batteries
//! - Forced-alternation insertion on intervening extremum bars
//! - The per-bar driver loop (`TrendEngine::process_new_bar`)
//!
//! The engine is forward-causal: the decision at bar *k* depends only on
//! bars 1…*k* and accumulated state. There is no I/O and no wall-clock
//! dependence anywhere in this crate.

pub mod domain;
pub mod engine;
pub mod patterns;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types handed across thread boundaries by
    /// callers running one engine per stream are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TrendEvent>();
        require_sync::<domain::TrendEvent>();
        require_send::<domain::RuleType>();
        require_sync::<domain::RuleType>();
        require_send::<engine::TrendEngine>();
        require_sync::<engine::TrendEngine>();
        require_send::<engine::EngineState>();
        require_sync::<engine::EngineState>();
        require_send::<engine::DebugRecord>();
        require_sync::<engine::DebugRecord>();
    }
}
