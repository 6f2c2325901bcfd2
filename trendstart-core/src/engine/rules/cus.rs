//! Uptrend-start confirmation battery.
//!
//! Evaluated only while an uptrend candidate exists. The battery order is
//! fixed; rule identity matters because post-confirmation seeding differs
//! per rule.

use crate::domain::{Bar, UptrendRule};
use crate::patterns;

use super::EXHAUSTION_MAX_BARS_FROM_CANDIDATE;
use crate::engine::state::Candidate;

/// Run the battery. `up` is the uptrend candidate under evaluation, `down`
/// the current downtrend candidate if any. Returns the first matching rule.
///
/// Containment suppression is the caller's concern; this function assumes
/// the gate already passed.
pub(crate) fn evaluate_uptrend_rules(
    current: &Bar,
    prev: &Bar,
    up: &Candidate,
    down: Option<&Candidate>,
    bars: &[Bar],
) -> Option<UptrendRule> {
    if exhaustion_reversal(current, prev, up, down) {
        return Some(UptrendRule::ExhaustionReversal);
    }
    if low_undercut_high_respect(current, prev, up, down) {
        return Some(UptrendRule::LowUndercutHighRespect);
    }
    if patterns::is_hhll_down_close(current, prev) {
        return Some(UptrendRule::HigherHighLowerLowDownClose);
    }
    if engulfing_up_with_downtrend_low_break(current, prev, down) {
        return Some(UptrendRule::EngulfingUpPdsLowBreak);
    }
    if breakout_after_failed_low(current, prev, up, down, bars) {
        return Some(UptrendRule::BreakoutAfterFailedLowV2);
    }
    None
}

/// A fully lower bar soon after the candidate: the decline has exhausted
/// without undercutting the downtrend candidate's low.
fn exhaustion_reversal(
    current: &Bar,
    prev: &Bar,
    up: &Candidate,
    down: Option<&Candidate>,
) -> bool {
    if !patterns::is_lower_ohlc(current, prev) {
        return false;
    }
    if let Some(down) = down {
        if current.low < down.low {
            return false;
        }
    }
    current.index - up.index <= EXHAUSTION_MAX_BARS_FROM_CANDIDATE
}

/// The current bar undercuts the low of a downtrend candidate that formed
/// after the uptrend candidate, while respecting its high and closing
/// higher than the previous bar.
fn low_undercut_high_respect(
    current: &Bar,
    prev: &Bar,
    up: &Candidate,
    down: Option<&Candidate>,
) -> bool {
    let Some(down) = down else { return false };
    if down.index <= up.index {
        return false;
    }
    current.low < down.low && current.high <= down.high && current.close > prev.close
}

/// Bullish engulfing (outside bar, up close, higher close than prev) that
/// also breaks the downtrend candidate's low.
fn engulfing_up_with_downtrend_low_break(
    current: &Bar,
    prev: &Bar,
    down: Option<&Candidate>,
) -> bool {
    let Some(down) = down else { return false };
    current.high > prev.high
        && current.low < prev.low
        && current.close > prev.close
        && current.close > current.open
        && current.low < down.low
}

/// The candidate's low held through a later downtrend candidate, and the
/// current bar breaks out above that candidate's high with strength.
fn breakout_after_failed_low(
    current: &Bar,
    prev: &Bar,
    up: &Candidate,
    down: Option<&Candidate>,
    bars: &[Bar],
) -> bool {
    let Some(down) = down else { return false };
    if down.index <= up.index {
        return false;
    }
    // Candidate low must be intact over every bar since the candidate.
    let low_intact = bars
        .get(up.index..current.index.saturating_sub(1))
        .into_iter()
        .flatten()
        .all(|bar| bar.low >= up.low);
    if !low_intact {
        return false;
    }
    current.high > down.high && current.close > prev.close && current.close > current.open
}
