//! Downtrend-start confirmation battery.
//!
//! Evaluated only while a downtrend candidate ("peak") exists. Most rules
//! share two scans over the bars between the peak and the previous bar:
//! no intervening bar may have taken out the peak's high, and several rules
//! additionally require a pullback to or below the peak's low.

use crate::domain::{Bar, DowntrendRule};
use crate::patterns;

use crate::engine::state::Candidate;

/// Run the battery. `peak` is the downtrend candidate under evaluation;
/// `peak_bar` is its full bar resolved from the history (the first rule
/// compares against the peak's open). Returns the first matching rule.
pub(crate) fn evaluate_downtrend_rules(
    current: &Bar,
    prev: &Bar,
    peak: &Candidate,
    bars: &[Bar],
) -> Option<DowntrendRule> {
    let peak_bar = &bars[peak.index - 1];
    if low_then_higher_close_vs_peak_open(current, prev, peak_bar, bars) {
        return Some(DowntrendRule::LowThenHigherCloseVsPdsOpen);
    }
    if rally_low_breaks_peak_low(current, prev, peak_bar, bars) {
        return Some(DowntrendRule::RallyLowBreaksPeakLowA);
    }
    if new_high_weak_advance(current, prev, peak_bar, bars) {
        return Some(DowntrendRule::NewHighWeakAdvanceB);
    }
    if failed_rally_after_low_break(current, prev, peak_bar, bars) {
        return Some(DowntrendRule::FailedRallyAfterLowBreakF);
    }
    if higher_ohlc_after_low_break(current, prev, peak_bar, bars) {
        return Some(DowntrendRule::HigherOhlcAfterLowBreakG);
    }
    if peak.index == prev.index && outside_bar_stronger_close(current, prev) {
        return Some(DowntrendRule::OutsideBarStrongerCloseH);
    }
    None
}

/// No bar strictly after the peak, up to and including `prev`, made a higher
/// high than the peak.
fn no_intermediate_higher_high(peak: &Bar, prev: &Bar, bars: &[Bar]) -> bool {
    bars.get(peak.index..prev.index)
        .into_iter()
        .flatten()
        .all(|bar| bar.high <= peak.high)
}

/// Some bar strictly after the peak, up to and including `prev`, pulled back
/// to or below the peak's low.
fn found_pullback(peak: &Bar, prev: &Bar, bars: &[Bar]) -> bool {
    bars.get(peak.index..prev.index)
        .into_iter()
        .flatten()
        .any(|bar| bar.low <= peak.low)
}

/// Upward sweep bar whose low still undercuts the peak's open.
fn low_then_higher_close_vs_peak_open(
    current: &Bar,
    prev: &Bar,
    peak: &Bar,
    bars: &[Bar],
) -> bool {
    patterns::is_low_then_higher_close(current, prev)
        && no_intermediate_higher_high(peak, prev, bars)
        && current.low < peak.open
}

/// After a pullback below the peak's low, a rally bar (higher high, higher
/// close) whose own low still undercuts the peak's low.
fn rally_low_breaks_peak_low(current: &Bar, prev: &Bar, peak: &Bar, bars: &[Bar]) -> bool {
    found_pullback(peak, prev, bars)
        && current.high > prev.high
        && current.close > prev.close
        && no_intermediate_higher_high(peak, prev, bars)
        && current.low < peak.low
}

/// After a pullback, a new high above the peak made with weak internals
/// (higher close, no lower low) — the breakout lacks conviction.
fn new_high_weak_advance(current: &Bar, prev: &Bar, peak: &Bar, bars: &[Bar]) -> bool {
    found_pullback(peak, prev, bars)
        && current.close > prev.close
        && current.low >= prev.low
        && current.high > peak.high
        && no_intermediate_higher_high(peak, prev, bars)
}

/// The previous bar broke the peak's low; the current bar rallies to a
/// higher high but closes below the previous close and its own open.
fn failed_rally_after_low_break(current: &Bar, prev: &Bar, peak: &Bar, bars: &[Bar]) -> bool {
    no_intermediate_higher_high(peak, prev, bars)
        && prev.low < peak.low
        && current.high > prev.high
        && current.close < prev.close
        && current.close < current.open
}

/// The previous bar broke the peak's low; the current bar is fully higher
/// OHLC — treated as a dead-cat bounce confirming the peak.
fn higher_ohlc_after_low_break(current: &Bar, prev: &Bar, peak: &Bar, bars: &[Bar]) -> bool {
    patterns::is_higher_ohlc(current, prev)
        && no_intermediate_higher_high(peak, prev, bars)
        && prev.low < peak.low
}

/// The peak is the previous bar itself and the current bar engulfs it while
/// closing above its close.
fn outside_bar_stronger_close(current: &Bar, prev_is_peak: &Bar) -> bool {
    current.high > prev_is_peak.high
        && current.low < prev_is_peak.low
        && current.close > prev_is_peak.close
}
