//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One completed OHLCV price interval.
///
/// `index` is the 1-based chronological position of the bar in its stream.
/// Volume is not consulted by the engine; it is carried through to emitted
/// events unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub index: usize,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a submitted bar was rejected before touching engine state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index}: non-finite OHLCV value")]
    NonFinite { index: usize },

    #[error("bar {index}: OHLC range violated (expected l <= min(o,c) <= max(o,c) <= h)")]
    InvalidRange { index: usize },

    #[error("bar {index}: negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },

    #[error("bar {index}: timestamp {timestamp} not after previous bar's {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("bar index {index} not contiguous (expected {expected})")]
    NonContiguousIndex { index: usize, expected: usize },
}

impl Bar {
    /// Validate this bar against the stream contract.
    ///
    /// `prev` is the last accepted bar (None for the first), `expected_index`
    /// the next contiguous 1-based index. A bar that fails here must not be
    /// appended to the history.
    pub fn validate(&self, prev: Option<&Bar>, expected_index: usize) -> Result<(), BarError> {
        if self.index != expected_index {
            return Err(BarError::NonContiguousIndex {
                index: self.index,
                expected: expected_index,
            });
        }
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite { index: self.index });
        }
        if self.low > self.open.min(self.close) || self.high < self.open.max(self.close) {
            return Err(BarError::InvalidRange { index: self.index });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume {
                index: self.index,
                volume: self.volume,
            });
        }
        if let Some(p) = prev {
            if self.timestamp <= p.timestamp {
                return Err(BarError::NonMonotonicTimestamp {
                    index: self.index,
                    timestamp: self.timestamp,
                    previous: p.timestamp,
                });
            }
        }
        Ok(())
    }

    /// Whether `self`'s full range sits inside `[low, high]`.
    pub fn is_inside(&self, high: f64, low: f64) -> bool {
        self.high <= high && self.low >= low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar(index: usize) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
                + chrono::Duration::days(index as i64),
            index,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn valid_bar_passes() {
        assert!(sample_bar(1).validate(None, 1).is_ok());
    }

    #[test]
    fn rejects_nan() {
        let mut bar = sample_bar(1);
        bar.open = f64::NAN;
        assert_eq!(
            bar.validate(None, 1),
            Err(BarError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn rejects_high_below_close() {
        let mut bar = sample_bar(1);
        bar.high = 102.0; // below close 103
        assert_eq!(
            bar.validate(None, 1),
            Err(BarError::InvalidRange { index: 1 })
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let first = sample_bar(1);
        let mut second = sample_bar(2);
        second.timestamp = first.timestamp;
        assert!(matches!(
            second.validate(Some(&first), 2),
            Err(BarError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn rejects_index_gap() {
        let first = sample_bar(1);
        let third = sample_bar(3);
        assert_eq!(
            third.validate(Some(&first), 2),
            Err(BarError::NonContiguousIndex {
                index: 3,
                expected: 2
            })
        );
    }

    #[test]
    fn inside_range_check() {
        let bar = sample_bar(1);
        assert!(bar.is_inside(105.0, 98.0));
        assert!(!bar.is_inside(104.0, 98.0));
        assert!(!bar.is_inside(105.0, 99.0));
    }

    #[test]
    fn serialization_roundtrip() {
        let bar = sample_bar(7);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar.index, deser.index);
        assert_eq!(bar.timestamp, deser.timestamp);
        assert_eq!(bar.close, deser.close);
    }
}
