//! Trendstart Runner — the I/O layer around the detector.
//!
//! Loads OHLC bars from CSV, drives the engine bar-by-bar, and exports the
//! resulting trend-start signals and debug traces. The engine itself stays
//! I/O-free; everything file-shaped lives here.

pub mod data_loader;
pub mod export;
pub mod simulation;

pub use data_loader::{compute_dataset_hash, load_bars_csv, load_bars_from_str, LoadError};
pub use export::{export_debug_csv, export_signals_csv, export_signals_json};
pub use simulation::{run_forward_simulation, SimulationResult};
