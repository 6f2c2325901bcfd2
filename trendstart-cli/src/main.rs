//! Trendstart CLI — run the detector over an OHLC CSV file.
//!
//! Loads bars, replays them through the forward engine one at a time, and
//! writes the confirmed trend starts as CSV. A debug bar range can be
//! traced to a separate CSV. Exits non-zero on any I/O or parse failure.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use trendstart_runner::{
    compute_dataset_hash, export_debug_csv, export_signals_csv, load_bars_csv,
    run_forward_simulation,
};

#[derive(Parser, Debug)]
#[command(name = "trendstart", about = "Causal trend-start detection over OHLC bars")]
struct Args {
    /// Input OHLC CSV (timestamp,open,high,low,close[,volume]).
    #[arg(long)]
    input_csv: PathBuf,

    /// Output CSV for confirmed trend starts.
    #[arg(long, default_value = "trend_starts.csv")]
    output_csv: PathBuf,

    /// Optional output CSV for the debug trace.
    #[arg(long)]
    debug_log_csv: Option<PathBuf>,

    /// First bar index (1-based) of the debug trace range.
    #[arg(long, requires = "debug_end")]
    debug_start: Option<usize>,

    /// Last bar index (1-based) of the debug trace range.
    #[arg(long, requires = "debug_start")]
    debug_end: Option<usize>,

    /// Contract label stamped on emitted signals.
    #[arg(long, default_value = "")]
    contract_id: String,

    /// Timeframe label stamped on emitted signals.
    #[arg(long, default_value = "1D")]
    timeframe: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bars = load_bars_csv(&args.input_csv)
        .with_context(|| format!("loading bars from {}", args.input_csv.display()))?;
    println!(
        "Loaded {} bars from {} (dataset {})",
        bars.len(),
        args.input_csv.display(),
        &compute_dataset_hash(&bars)[..16],
    );

    let debug_range = match (args.debug_start, args.debug_end) {
        (Some(start), Some(end)) => {
            if start > end {
                bail!("--debug-start ({start}) must not exceed --debug-end ({end})");
            }
            println!("Debug trace active for bars {start} to {end}");
            Some((start, end))
        }
        _ => None,
    };

    let result = run_forward_simulation(&bars, &args.contract_id, &args.timeframe, debug_range)
        .context("forward simulation failed")?;

    for signal in &result.signals {
        println!(
            "{} confirmed at bar {} (triggered by bar {}) - rule: {}",
            signal.signal_type.short_name(),
            signal.confirmed_bar_index(),
            signal.details.triggering_bar_index,
            signal.details.rule_type,
        );
    }

    let signals_csv = export_signals_csv(&result.signals)?;
    std::fs::write(&args.output_csv, signals_csv)
        .with_context(|| format!("writing {}", args.output_csv.display()))?;
    println!(
        "Exported {} trend starts to {}",
        result.signals.len(),
        args.output_csv.display()
    );

    if let Some(path) = &args.debug_log_csv {
        let debug_csv = export_debug_csv(&result.debug_records)?;
        std::fs::write(path, debug_csv)
            .with_context(|| format!("writing {}", path.display()))?;
        println!(
            "Exported {} debug records to {}",
            result.debug_records.len(),
            path.display()
        );
    }

    Ok(())
}
