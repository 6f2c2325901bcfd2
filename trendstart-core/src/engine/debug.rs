//! Range-gated debug trace.
//!
//! The engine owns its trace collector — there is no process-wide logging
//! state. Records are only materialized while the processed bar index falls
//! inside the configured 1-based range, so tracing a window of a long stream
//! costs nothing outside it. Each record snapshots the candidate and
//! containment state at the moment it was written.

use serde::Serialize;

use super::state::{EngineState, TrendDirection};

/// One structured trace record.
#[derive(Debug, Clone, Serialize)]
pub struct DebugRecord {
    pub processing_bar_index: usize,
    pub message: String,
    pub up_candidate_index: Option<usize>,
    pub down_candidate_index: Option<usize>,
    pub in_containment: bool,
    pub last_trend: Option<TrendDirection>,
    pub last_trend_bar_index: Option<usize>,
}

/// Collector for debug records, gated by an optional bar-index range.
#[derive(Debug, Clone, Default)]
pub struct DebugContext {
    range: Option<(usize, usize)>,
    records: Vec<DebugRecord>,
}

impl DebugContext {
    /// A context that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Record transitions for bars with `start <= index <= end` (1-based).
    pub fn with_range(start: usize, end: usize) -> Self {
        Self {
            range: Some((start, end)),
            records: Vec::new(),
        }
    }

    pub fn is_active(&self, bar_index: usize) -> bool {
        self.range
            .map_or(false, |(start, end)| (start..=end).contains(&bar_index))
    }

    /// Append a record if `bar_index` is in range. The message closure is
    /// only invoked when the record is actually kept.
    pub(crate) fn log<F>(&mut self, bar_index: usize, state: &EngineState, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.is_active(bar_index) {
            return;
        }
        self.records.push(DebugRecord {
            processing_bar_index: bar_index,
            message: message(),
            up_candidate_index: state.up_candidate.map(|c| c.index),
            down_candidate_index: state.down_candidate.map(|c| c.index),
            in_containment: state.containment.is_some(),
            last_trend: state.last_confirmed.map(|l| l.direction),
            last_trend_bar_index: state.last_confirmed.map(|l| l.bar_index),
        });
    }

    pub fn records(&self) -> &[DebugRecord] {
        &self.records
    }
}
