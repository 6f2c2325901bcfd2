//! Trend-start events — the engine's output record.
//!
//! An event names an earlier bar as the confirmed start of an uptrend or
//! downtrend, carries that bar's OHLCV snapshot, and identifies the rule
//! that fired plus the bar whose arrival triggered the confirmation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Bar;

/// Polarity of a confirmed trend start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalType {
    #[serde(rename = "downtrend_start")]
    DowntrendStart,
    #[serde(rename = "uptrend_start")]
    UptrendStart,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DowntrendStart => "downtrend_start",
            Self::UptrendStart => "uptrend_start",
        }
    }

    /// The type name without the `_start` suffix, as used by the CSV export.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::DowntrendStart => "downtrend",
            Self::UptrendStart => "uptrend",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules that confirm an uptrend start, in battery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UptrendRule {
    ExhaustionReversal,
    LowUndercutHighRespect,
    HigherHighLowerLowDownClose,
    EngulfingUpPdsLowBreak,
    BreakoutAfterFailedLowV2,
}

impl UptrendRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExhaustionReversal => "EXHAUSTION_REVERSAL",
            Self::LowUndercutHighRespect => "LowUndercutHighRespect",
            Self::HigherHighLowerLowDownClose => "HigherHighLowerLowDownClose",
            Self::EngulfingUpPdsLowBreak => "EngulfingUpPDSLowBreak",
            Self::BreakoutAfterFailedLowV2 => "BreakoutAfterFailedLowV2",
        }
    }
}

/// Rules that confirm a downtrend start, in battery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DowntrendRule {
    LowThenHigherCloseVsPdsOpen,
    RallyLowBreaksPeakLowA,
    NewHighWeakAdvanceB,
    FailedRallyAfterLowBreakF,
    HigherOhlcAfterLowBreakG,
    OutsideBarStrongerCloseH,
}

impl DowntrendRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowThenHigherCloseVsPdsOpen => "LowThenHigherClose_vs_PDSOpen",
            Self::RallyLowBreaksPeakLowA => "RallyLowBreaksPeakLow_A",
            Self::NewHighWeakAdvanceB => "NewHighWeakAdvance_B",
            Self::FailedRallyAfterLowBreakF => "FailedRallyAfterLowBreak_F",
            Self::HigherOhlcAfterLowBreakG => "HigherOHLCAfterLowBreak_G",
            Self::OutsideBarStrongerCloseH => "OutsideBarStrongerClose_H",
        }
    }
}

/// The rule identifier attached to an emitted event.
///
/// Forced variants mark alternation-driven insertions and name the rule
/// whose confirmation forced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    Uptrend(UptrendRule),
    Downtrend(DowntrendRule),
    ForcedByUptrend(UptrendRule),
    ForcedByDowntrend(DowntrendRule),
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uptrend(r) => f.write_str(r.as_str()),
            Self::Downtrend(r) => f.write_str(r.as_str()),
            Self::ForcedByUptrend(r) => write!(f, "FORCED_by_CUS_{}", r.as_str()),
            Self::ForcedByDowntrend(r) => write!(f, "FORCED_by_CDS_{}", r.as_str()),
        }
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const UP: [UptrendRule; 5] = [
            UptrendRule::ExhaustionReversal,
            UptrendRule::LowUndercutHighRespect,
            UptrendRule::HigherHighLowerLowDownClose,
            UptrendRule::EngulfingUpPdsLowBreak,
            UptrendRule::BreakoutAfterFailedLowV2,
        ];
        const DOWN: [DowntrendRule; 6] = [
            DowntrendRule::LowThenHigherCloseVsPdsOpen,
            DowntrendRule::RallyLowBreaksPeakLowA,
            DowntrendRule::NewHighWeakAdvanceB,
            DowntrendRule::FailedRallyAfterLowBreakF,
            DowntrendRule::HigherOhlcAfterLowBreakG,
            DowntrendRule::OutsideBarStrongerCloseH,
        ];
        if let Some(rest) = s.strip_prefix("FORCED_by_CUS_") {
            return UP
                .iter()
                .find(|r| r.as_str() == rest)
                .map(|r| Self::ForcedByUptrend(*r))
                .ok_or_else(|| format!("unknown forced uptrend rule '{rest}'"));
        }
        if let Some(rest) = s.strip_prefix("FORCED_by_CDS_") {
            return DOWN
                .iter()
                .find(|r| r.as_str() == rest)
                .map(|r| Self::ForcedByDowntrend(*r))
                .ok_or_else(|| format!("unknown forced downtrend rule '{rest}'"));
        }
        if let Some(r) = UP.iter().find(|r| r.as_str() == s) {
            return Ok(Self::Uptrend(*r));
        }
        if let Some(r) = DOWN.iter().find(|r| r.as_str() == s) {
            return Ok(Self::Downtrend(*r));
        }
        Err(format!("unknown rule '{s}'"))
    }
}

impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Confirmation bookkeeping attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    pub confirmed_signal_bar_index: usize,
    /// ISO 8601 timestamp of the confirmed bar.
    pub confirmed_signal_bar_date: String,
    pub triggering_bar_index: usize,
    pub rule_type: RuleType,
}

/// A confirmed trend-start, naming the confirmed bar.
///
/// `signal_*` fields snapshot the confirmed bar's OHLCV; `signal_price` is
/// its close. The triggering bar (the one whose arrival fired the rule) is
/// recorded by index only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEvent {
    pub timestamp: DateTime<Utc>,
    pub contract_id: String,
    pub timeframe: String,
    pub signal_type: SignalType,
    pub signal_price: f64,
    pub signal_open: f64,
    pub signal_high: f64,
    pub signal_low: f64,
    pub signal_close: f64,
    pub signal_volume: f64,
    pub details: EventDetails,
}

impl TrendEvent {
    /// Build an event naming `confirmed` as the trend start.
    pub fn new(
        confirmed: &Bar,
        signal_type: SignalType,
        triggering_bar_index: usize,
        rule_type: RuleType,
        contract_id: &str,
        timeframe: &str,
    ) -> Self {
        Self {
            timestamp: confirmed.timestamp,
            contract_id: contract_id.to_string(),
            timeframe: timeframe.to_string(),
            signal_type,
            signal_price: confirmed.close,
            signal_open: confirmed.open,
            signal_high: confirmed.high,
            signal_low: confirmed.low,
            signal_close: confirmed.close,
            signal_volume: confirmed.volume,
            details: EventDetails {
                confirmed_signal_bar_index: confirmed.index,
                confirmed_signal_bar_date: confirmed.timestamp.to_rfc3339(),
                triggering_bar_index,
                rule_type,
            },
        }
    }

    pub fn confirmed_bar_index(&self) -> usize {
        self.details.confirmed_signal_bar_index
    }

    /// Dedup key: one event per (confirmed bar, polarity).
    pub fn dedup_key(&self) -> (usize, SignalType) {
        (self.details.confirmed_signal_bar_index, self.signal_type)
    }

    /// Sort key for `all_signals`: confirmed bar, then polarity
    /// (`downtrend_start` before `uptrend_start`), then triggering bar.
    pub fn sort_key(&self) -> (usize, SignalType, usize) {
        (
            self.details.confirmed_signal_bar_index,
            self.signal_type,
            self.details.triggering_bar_index,
        )
    }
}
