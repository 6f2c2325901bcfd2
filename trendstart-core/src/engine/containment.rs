//! Containment tracking — price coiling inside a candidate bar's range.
//!
//! When the stream trades entirely inside the range of the current downtrend
//! candidate (preferred) or uptrend candidate, a window opens. While the
//! window is open and older than the grace period, confirmations are
//! suppressed; new-signal scanning is suppressed for every bar after the one
//! that opened the window.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

use super::debug::DebugContext;
use super::state::EngineState;

/// How many bars into a containment window confirmations are still allowed.
pub const CONTAINMENT_CONFIRM_GRACE_BARS: usize = 5;

/// Which candidate's range defines the active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainmentRef {
    PendingDowntrendHigh,
    PendingUptrendLow,
}

/// An active containment window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Containment {
    pub ref_bar_index: usize,
    pub ref_kind: ContainmentRef,
    pub ref_high: f64,
    pub ref_low: f64,
    /// First bar observed inside the reference range.
    pub start_bar_index: usize,
    /// Consecutive bars inside, counting the start bar.
    pub bars_inside: usize,
}

impl Containment {
    /// Confirmation gate: true once the window is older than the grace
    /// period. Shared by both rule batteries.
    pub fn suppresses_confirmation(&self, current_index: usize) -> bool {
        current_index > self.start_bar_index + CONTAINMENT_CONFIRM_GRACE_BARS
    }

    /// Scanning gate: only the bar that opened the window may still nominate
    /// new pending signals.
    pub fn suppresses_scanning(&self, current_index: usize) -> bool {
        current_index != self.start_bar_index
    }
}

/// Advance containment state for `current`.
///
/// An active window is checked first: the bar either stays inside
/// (incrementing the count) or closes the window. Entry is checked
/// afterwards, so a bar that breaks one window can immediately open another
/// against the candidate of record.
pub(crate) fn update_containment(state: &mut EngineState, current: &Bar, debug: &mut DebugContext) {
    if let Some(mut window) = state.containment {
        if current.index == window.start_bar_index {
            // The opening bar is counted once, at entry.
        } else if current.is_inside(window.ref_high, window.ref_low) {
            window.bars_inside += 1;
            state.containment = Some(window);
            debug.log(current.index, state, || {
                format!(
                    "Containment: bar {} inside bar {} for {} bars",
                    current.index, window.ref_bar_index, window.bars_inside
                )
            });
        } else {
            let break_kind = if current.close > window.ref_high {
                "breakout above"
            } else if current.close < window.ref_low {
                "breakdown below"
            } else {
                "moves outside"
            };
            debug.log(current.index, state, || {
                format!(
                    "Containment ended: bar {} {break_kind} bar {} range after {} bar(s) inside",
                    current.index, window.ref_bar_index, window.bars_inside
                )
            });
            state.containment = None;
        }
    }

    if state.containment.is_none() {
        let reference = state
            .down_candidate
            .map(|cand| (cand, ContainmentRef::PendingDowntrendHigh))
            .or_else(|| {
                state
                    .up_candidate
                    .map(|cand| (cand, ContainmentRef::PendingUptrendLow))
            });
        if let Some((cand, ref_kind)) = reference {
            if cand.index != current.index && current.is_inside(cand.high, cand.low) {
                state.containment = Some(Containment {
                    ref_bar_index: cand.index,
                    ref_kind,
                    ref_high: cand.high,
                    ref_low: cand.low,
                    start_bar_index: current.index,
                    bars_inside: 1,
                });
                debug.log(current.index, state, || {
                    format!(
                        "Containment start: bar {} inside bar {} ({ref_kind:?} H:{} L:{})",
                        current.index, cand.index, cand.high, cand.low
                    )
                });
            }
        }
    }
}
