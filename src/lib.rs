//! Icecast SoundExchange Reports
//!
//! Builds per-mount-point listener reports for SoundExchange from Icecast access
//! logs. A run reads the access logs covering an operator-supplied date window,
//! reconstructs when each listener connected from the logged disconnect time and
//! session length, and writes one tab-separated report per mount point, either as
//! loose files or inside a single zip archive.
//!
//! ## Architecture Overview
//!
//! - [`timestamp_parser`] - Log and operator date parsing, local/UTC conversion
//! - [`parser`] - Access-log line grammar and mount point filtering
//! - [`file_discovery`] - Picks the rotated and live logs that cover the window
//! - [`aggregator`] - Sorts, filters and buckets sessions by mount point
//! - [`reports`] - Report file naming, rendering, directory and zip output
//! - [`analyzer`] - Runs the pipeline end to end
//! - [`models`] - Shared data structures
//! - [`config`] - Configuration defaults, file and environment overrides
//! - [`logging`] - Structured logging setup
//! - [`display`] - Run summary output
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use icecast_sx_report::{Config, RunConfig, RunRequest, SxReportAnalyzer};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let run = RunConfig::build(&config, RunRequest {
//!     start: "04/Mar/2013".to_string(),
//!     end: "06/Mar/2013".to_string(),
//!     mount_points: Some(vec!["stream".to_string()]),
//!     ..Default::default()
//! })?;
//! let summary = SxReportAnalyzer::new(run)?.run()?;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod display;
pub mod file_discovery;
pub mod logging;
pub mod models;
pub mod parser;
pub mod reports;
pub mod timestamp_parser;

pub use analyzer::SxReportAnalyzer;
pub use config::{Config, RunConfig, RunRequest};
pub use models::*;
