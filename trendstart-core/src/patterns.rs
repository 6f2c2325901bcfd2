//! Two-bar pattern predicates.
//!
//! Pure, side-effect-free checks over (current, previous) bar pairs. These
//! feed both the pending-signal scanner and the confirmation rule batteries;
//! none of them look at more than the two bars they are given.

use crate::domain::Bar;

/// Lower low, lower high, lower close than the previous bar.
pub fn is_lower_ohlc(current: &Bar, prev: &Bar) -> bool {
    current.low < prev.low && current.high < prev.high && current.close < prev.close
}

/// Higher low, higher high, higher close than the previous bar.
pub fn is_higher_ohlc(current: &Bar, prev: &Bar) -> bool {
    current.low > prev.low && current.high > prev.high && current.close > prev.close
}

/// Lower low but higher high and higher close — an upward outside-ish
/// reversal bar.
pub fn is_low_then_higher_close(current: &Bar, prev: &Bar) -> bool {
    current.low < prev.low && current.high > prev.high && current.close > prev.close
}

/// Nominates the previous bar as a pending uptrend start: the current bar
/// holds the previous low and closes above the previous open.
pub fn is_pending_uptrend_rule(current: &Bar, prev: &Bar) -> bool {
    current.low >= prev.low && current.close > prev.open
}

/// Nominates the previous bar as a pending downtrend start: the current bar
/// fails to take out the previous high and closes below the previous open.
pub fn is_pending_downtrend_rule(current: &Bar, prev: &Bar) -> bool {
    current.high <= prev.high && current.close < prev.open
}

/// Weak form of the pending-uptrend nomination: no lower low.
pub fn is_simple_pending_uptrend(current: &Bar, prev: &Bar) -> bool {
    current.low >= prev.low
}

/// Weak form of the pending-downtrend nomination: no higher high.
pub fn is_simple_pending_downtrend(current: &Bar, prev: &Bar) -> bool {
    current.high <= prev.high
}

/// Outside bar (higher high and lower low) that closes below its own open.
pub fn is_hhll_down_close(current: &Bar, prev: &Bar) -> bool {
    current.high > prev.high && current.low < prev.low && current.close < current.open
}
