//! Intervening-extremum selection for forced alternation.

use crate::domain::Bar;

use super::state::TrendDirection;

/// Pick the bar on which a forced opposite signal is inserted.
///
/// Scans the bars strictly between `prev_confirmed_index` and
/// `new_confirmed_index` (1-based, exclusive on both ends). A forced
/// downtrend lands on the maximum high; a forced uptrend on the minimum low.
/// Ties resolve to the earliest bar. Returns None when the intervening range
/// is empty or the bounds fall outside the history.
pub(crate) fn find_intervening_extremum<'a>(
    bars: &'a [Bar],
    prev_confirmed_index: usize,
    new_confirmed_index: usize,
    forced_direction: TrendDirection,
) -> Option<&'a Bar> {
    if prev_confirmed_index == 0
        || new_confirmed_index == 0
        || new_confirmed_index > bars.len()
        || prev_confirmed_index > new_confirmed_index
    {
        return None;
    }
    // Strictly between both endpoints.
    let first = prev_confirmed_index + 1;
    let last = new_confirmed_index.checked_sub(1)?;
    if first > last {
        return None;
    }
    let slice = &bars[first - 1..last];
    match forced_direction {
        TrendDirection::Up => slice.iter().fold(None, |best: Option<&Bar>, bar| match best {
            Some(b) if b.low <= bar.low => Some(b),
            _ => Some(bar),
        }),
        TrendDirection::Down => slice.iter().fold(None, |best: Option<&Bar>, bar| match best {
            Some(b) if b.high >= bar.high => Some(b),
            _ => Some(bar),
        }),
    }
}
