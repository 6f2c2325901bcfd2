//! Bar loading from OHLC CSV files.
//!
//! Expected header: `timestamp,open,high,low,close[,volume]`. Rows must be
//! chronological; timestamps are ISO 8601 with or without an offset (naive
//! timestamps are taken as UTC). The volume column is optional and defaults
//! to zero. Bars are assigned 1-based indices in file order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use trendstart_core::domain::Bar;

/// Errors from the CSV loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{column}' (expected timestamp,open,high,low,close[,volume])")]
    MissingColumn { column: &'static str },

    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("no bars in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Load a chronological bar stream from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
    load_bars_from_str(&contents)
}

/// Load a bar stream from CSV text (the file-based loader's core).
pub fn load_bars_from_str(contents: &str) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::Reader::from_reader(contents.as_bytes());

    let headers = reader.headers()?.clone();
    for column in ["timestamp", "open", "high", "low", "close"] {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn { column });
        }
    }

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<RawRow>().enumerate() {
        let row = row?;
        let index = i + 1;
        let timestamp =
            parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
                row: index + 1, // header occupies the first file row
                value: row.timestamp.clone(),
            })?;
        bars.push(Bar {
            timestamp,
            index,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or(0.0),
        });
    }
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

/// ISO 8601 with offset, naive datetime (assumed UTC), or bare date.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Deterministic BLAKE3 hash over the loaded stream.
///
/// Covers timestamps and all OHLCV values in order, so two runs over the
/// same input are provably fed identical data.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_rfc3339().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-02T00:00:00Z,100.0,105.0,98.0,103.0,1000
2024-01-03T00:00:00Z,103.0,106.0,101.0,104.5,1100
";

    #[test]
    fn loads_bars_with_indices() {
        let bars = load_bars_from_str(SAMPLE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].index, 1);
        assert_eq!(bars[1].index, 2);
        assert_eq!(bars[0].close, 103.0);
        assert_eq!(bars[1].volume, 1100.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn volume_column_is_optional() {
        let csv = "\
timestamp,open,high,low,close
2024-01-02T00:00:00Z,100.0,105.0,98.0,103.0
";
        let bars = load_bars_from_str(csv).unwrap();
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn naive_and_date_only_timestamps_parse_as_utc() {
        let csv = "\
timestamp,open,high,low,close
2024-01-02 09:30:00,100.0,105.0,98.0,103.0
2024-01-03,103.0,106.0,101.0,104.5
";
        let bars = load_bars_from_str(csv).unwrap();
        assert_eq!(bars[0].timestamp.to_rfc3339(), "2024-01-02T09:30:00+00:00");
        assert_eq!(bars[1].timestamp.to_rfc3339(), "2024-01-03T00:00:00+00:00");
    }

    #[test]
    fn missing_column_is_a_typed_error() {
        let csv = "\
timestamp,open,high,close
2024-01-02T00:00:00Z,100.0,105.0,103.0
";
        let err = load_bars_from_str(csv).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "low" }));
    }

    #[test]
    fn bad_timestamp_names_the_row() {
        let csv = "\
timestamp,open,high,low,close
2024-01-02T00:00:00Z,100.0,105.0,98.0,103.0
not-a-date,103.0,106.0,101.0,104.5
";
        let err = load_bars_from_str(csv).unwrap_err();
        match err {
            LoadError::Timestamp { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = load_bars_from_str("timestamp,open,high,low,close\n").unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn dataset_hash_is_deterministic_and_content_sensitive() {
        let bars = load_bars_from_str(SAMPLE).unwrap();
        let h1 = compute_dataset_hash(&bars);
        let h2 = compute_dataset_hash(&bars);
        assert_eq!(h1, h2);

        let mut tweaked = bars.clone();
        tweaked[0].close += 0.01;
        assert_ne!(h1, compute_dataset_hash(&tweaked));
    }
}
