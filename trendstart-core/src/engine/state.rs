//! Mutable engine state: pending marks, candidates, and the confirmed-trend
//! marker.
//!
//! Two levels of pending bookkeeping are kept per polarity, mirroring how
//! confirmations consume them:
//! - a *pending mark* — the most recent bar that met initial nomination
//!   criteria (used to resolve a bar that nominates both directions);
//! - a *candidate* — the best-so-far nominated bar actively awaiting
//!   confirmation (lowest low for uptrend starts, highest high for
//!   downtrend starts).
//!
//! A single bar may be both the uptrend and the downtrend candidate.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

use super::containment::Containment;

/// Polarity of the last confirmed trend start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    #[serde(rename = "uptrend")]
    Up,
    #[serde(rename = "downtrend")]
    Down,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "uptrend",
            Self::Down => "downtrend",
        }
    }
}

/// The best pending bar of one polarity, cached by index and extremes.
///
/// The full bar stays in the history; rules that need its open resolve it
/// through the bar list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub index: usize,
    pub high: f64,
    pub low: f64,
}

impl Candidate {
    pub fn from_bar(bar: &Bar) -> Self {
        Self {
            index: bar.index,
            high: bar.high,
            low: bar.low,
        }
    }
}

/// The most recent bar that met initial nomination criteria for one
/// polarity. `anchor` is the bar's low (uptrend) or high (downtrend).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingMark {
    pub index: usize,
    pub anchor: f64,
}

/// Marker for the last confirmed trend start, driving alternation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastConfirmed {
    pub direction: TrendDirection,
    pub bar_index: usize,
}

/// All mutable detector state apart from the bar history itself.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub pending_up: Option<PendingMark>,
    pub pending_down: Option<PendingMark>,
    pub up_candidate: Option<Candidate>,
    pub down_candidate: Option<Candidate>,
    pub containment: Option<Containment>,
    pub last_confirmed: Option<LastConfirmed>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nominate `bar` as a pending downtrend start.
    ///
    /// Rejected outright when the bar immediately before it has a strictly
    /// higher high. Otherwise the candidate is replaced only on a strictly
    /// higher high (monotone replacement). Returns whether the candidate
    /// was set or improved.
    pub fn set_pending_downtrend(&mut self, bar: &Bar, prev_to_bar: Option<&Bar>) -> bool {
        if let Some(prev) = prev_to_bar {
            if bar.high < prev.high {
                return false;
            }
        }
        let improves = self
            .down_candidate
            .map_or(true, |cand| bar.high > cand.high);
        if improves {
            self.pending_down = Some(PendingMark {
                index: bar.index,
                anchor: bar.high,
            });
            self.down_candidate = Some(Candidate::from_bar(bar));
        }
        improves
    }

    /// Nominate `bar` as a pending uptrend start.
    ///
    /// The pending mark is always refreshed; the candidate is replaced only
    /// on a strictly lower low. A downtrend pending mark sitting on the same
    /// bar is cleared (the downtrend *candidate* is left alone). Returns
    /// whether the candidate was set or improved.
    pub fn set_pending_uptrend(&mut self, bar: &Bar) -> bool {
        self.pending_up = Some(PendingMark {
            index: bar.index,
            anchor: bar.low,
        });
        let improves = self.up_candidate.map_or(true, |cand| bar.low < cand.low);
        if improves {
            self.up_candidate = Some(Candidate::from_bar(bar));
        }
        if self.pending_down.map_or(false, |mark| mark.index == bar.index) {
            self.pending_down = None;
        }
        improves
    }

    /// Clear all pending-uptrend bookkeeping (mark and candidate).
    pub fn clear_pending_uptrend(&mut self) {
        self.pending_up = None;
        self.up_candidate = None;
    }

    /// Clear all pending-downtrend bookkeeping (mark and candidate).
    pub fn clear_pending_downtrend(&mut self) {
        self.pending_down = None;
        self.down_candidate = None;
    }

    /// Record a confirmed trend start of the given polarity.
    pub fn mark_confirmed(&mut self, direction: TrendDirection, bar_index: usize) {
        self.last_confirmed = Some(LastConfirmed {
            direction,
            bar_index,
        });
    }
}
