//! Batch forward-simulation driver.
//!
//! Feeds an engine one bar at a time — exactly what a live caller would do —
//! and returns the consolidated signal list plus any debug trace collected.
//! This is the entry point the CLI uses.

use trendstart_core::domain::{Bar, BarError, TrendEvent};
use trendstart_core::engine::{DebugRecord, TrendEngine};

/// Outcome of a full forward run.
#[derive(Debug)]
pub struct SimulationResult {
    /// Sorted, deduplicated signals (see `TrendEngine::all_signals`).
    pub signals: Vec<TrendEvent>,
    /// Debug trace records, empty unless a debug range was requested.
    pub debug_records: Vec<DebugRecord>,
    pub bar_count: usize,
}

/// Run the detector over a pre-loaded chronological bar stream.
///
/// `debug_range` enables the structured trace for a 1-based bar-index
/// window. The first malformed bar aborts the run with its error.
pub fn run_forward_simulation(
    bars: &[Bar],
    contract_id: &str,
    timeframe: &str,
    debug_range: Option<(usize, usize)>,
) -> Result<SimulationResult, BarError> {
    let mut engine = TrendEngine::new(contract_id, timeframe);
    if let Some((start, end)) = debug_range {
        engine.enable_debug_range(start, end);
    }
    for bar in bars {
        engine.process_new_bar(*bar)?;
    }
    Ok(SimulationResult {
        signals: engine.all_signals(),
        debug_records: engine.debug_records().to_vec(),
        bar_count: bars.len(),
    })
}
