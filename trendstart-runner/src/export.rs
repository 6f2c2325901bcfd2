//! Signal and debug-log export — CSV and JSON.
//!
//! The results CSV is the compact human-facing summary
//! (`trend_start_type,bar_index,date,rule,trigger_bar_index`, sorted by
//! bar index then type); JSON carries the full event payload for
//! downstream consumers.

use anyhow::{Context, Result};
use trendstart_core::domain::TrendEvent;
use trendstart_core::engine::DebugRecord;

/// Export signals as the results CSV.
pub fn export_signals_csv(signals: &[TrendEvent]) -> Result<String> {
    let mut rows: Vec<&TrendEvent> = signals.iter().collect();
    rows.sort_by_key(|e| (e.confirmed_bar_index(), e.signal_type.short_name()));

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trend_start_type", "bar_index", "date", "rule", "trigger_bar_index"])?;
    for event in rows {
        wtr.write_record([
            event.signal_type.short_name(),
            &event.confirmed_bar_index().to_string(),
            &event.details.confirmed_signal_bar_date,
            &event.details.rule_type.to_string(),
            &event.details.triggering_bar_index.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export the full event list as pretty JSON.
pub fn export_signals_json(signals: &[TrendEvent]) -> Result<String> {
    serde_json::to_string_pretty(signals).context("failed to serialize signals to JSON")
}

/// Export debug trace records as CSV.
pub fn export_debug_csv(records: &[DebugRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "processing_bar_index",
        "message",
        "up_candidate_index",
        "down_candidate_index",
        "in_containment",
        "last_trend",
        "last_trend_bar_index",
    ])?;
    for record in records {
        wtr.write_record([
            &record.processing_bar_index.to_string(),
            &record.message,
            &optional(record.up_candidate_index),
            &optional(record.down_candidate_index),
            &record.in_containment.to_string(),
            &record
                .last_trend
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            &optional(record.last_trend_bar_index),
        ])?;
    }
    finish(wtr)
}

fn optional(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trendstart_core::domain::{Bar, DowntrendRule, RuleType, SignalType, UptrendRule};

    fn event(index: usize, signal_type: SignalType, rule: RuleType, trigger: usize) -> TrendEvent {
        let bar = Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(index as i64),
            index,
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100.0,
        };
        TrendEvent::new(&bar, signal_type, trigger, rule, "MES", "1D")
    }

    #[test]
    fn signals_csv_has_expected_shape() {
        let signals = vec![
            event(
                4,
                SignalType::UptrendStart,
                RuleType::Uptrend(UptrendRule::ExhaustionReversal),
                7,
            ),
            event(
                2,
                SignalType::DowntrendStart,
                RuleType::Downtrend(DowntrendRule::FailedRallyAfterLowBreakF),
                5,
            ),
        ];
        let csv = export_signals_csv(&signals).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "trend_start_type,bar_index,date,rule,trigger_bar_index"
        );
        // sorted by bar index even though input was reversed
        assert!(lines[1].starts_with("downtrend,2,"));
        assert!(lines[1].ends_with(",FailedRallyAfterLowBreak_F,5"));
        assert!(lines[2].starts_with("uptrend,4,"));
        assert!(lines[2].ends_with(",EXHAUSTION_REVERSAL,7"));
    }

    #[test]
    fn signals_json_roundtrips() {
        let signals = vec![event(
            3,
            SignalType::DowntrendStart,
            RuleType::ForcedByUptrend(UptrendRule::HigherHighLowerLowDownClose),
            6,
        )];
        let json = export_signals_json(&signals).unwrap();
        let parsed: Vec<TrendEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].confirmed_bar_index(), 3);
        assert_eq!(
            parsed[0].details.rule_type,
            RuleType::ForcedByUptrend(UptrendRule::HigherHighLowerLowDownClose)
        );
    }

    #[test]
    fn empty_signal_list_yields_header_only() {
        let csv = export_signals_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
