//! Report Run Orchestration
//!
//! [`SxReportAnalyzer`] wires the pipeline together for one run:
//!
//! 1. **Selection**: [`LogFileSelector`] picks the access logs for the date window
//! 2. **Aggregation**: [`SessionAggregator`] parses, filters and buckets sessions
//! 3. **Reporting**: [`ReportWriter`] writes one report per mount point
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use icecast_sx_report::analyzer::SxReportAnalyzer;
//! use icecast_sx_report::config::{Config, RunConfig, RunRequest};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let run = RunConfig::build(&config, RunRequest {
//!     start: "04/Mar/2013".to_string(),
//!     end: "06/Mar/2013".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let summary = SxReportAnalyzer::new(run)?.run()?;
//! println!("{} sessions reported", summary.total_sessions());
//! # Ok(())
//! # }
//! ```
//!
//! I/O failures abort the run. Reports already written before the failure are
//! left in place.

use crate::aggregator::SessionAggregator;
use crate::config::RunConfig;
use crate::file_discovery::LogFileSelector;
use crate::logging::new_run_id;
use crate::models::RunSummary;
use crate::reports::ReportWriter;
use anyhow::Result;
use tracing::{info, info_span, warn};

pub struct SxReportAnalyzer {
    run: RunConfig,
    selector: LogFileSelector,
    aggregator: SessionAggregator,
    writer: ReportWriter,
}

impl SxReportAnalyzer {
    pub fn new(run: RunConfig) -> Result<Self> {
        let selector = LogFileSelector::new(&run.file_pattern, &run.excluded_addresses)?;
        let aggregator = SessionAggregator::new(run.aggregate);

        Ok(Self {
            run,
            selector,
            aggregator,
            writer: ReportWriter::new(),
        })
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    pub fn run(&self) -> Result<RunSummary> {
        let run_id = new_run_id();
        let span = info_span!("run", run_id = %run_id);
        let _enter = span.enter();

        let window = &self.run.window;
        info!(
            start = %window.start_date,
            end = %window.end_date,
            log_directory = %self.run.log_directory.display(),
            mount_points = ?self.run.mount_points.names(),
            "Starting report run"
        );

        let selection = self
            .selector
            .select_log_lines(&self.run.log_directory, window)?;
        info!(
            files = selection.stats.files_read,
            lines = selection.lines.len(),
            excluded = selection.stats.lines_excluded,
            "Selected log lines"
        );
        if selection.stats.files_read == 0 {
            warn!(
                log_directory = %self.run.log_directory.display(),
                "No access logs matched the date window"
            );
        }

        let aggregation = self
            .aggregator
            .aggregate(&selection.lines, window, &self.run.mount_points);
        info!(
            sessions = aggregation.stats.bucketed,
            malformed = aggregation.stats.malformed,
            too_short = aggregation.stats.too_short,
            outside_window = aggregation.stats.outside_window,
            "Aggregated sessions"
        );

        let reports = self
            .writer
            .write(&aggregation.buckets, &self.run.output, window.end_date)?;

        Ok(RunSummary {
            run_id,
            start_date: window.start_date.format("%Y-%m-%d").to_string(),
            end_date: window.end_date.format("%Y-%m-%d").to_string(),
            destination: self.run.output.to_string(),
            files_read: selection.stats.files_read,
            lines_read: selection.lines.len(),
            malformed_lines: aggregation.stats.malformed,
            short_sessions: aggregation.stats.too_short,
            outside_window: aggregation.stats.outside_window,
            reports,
        })
    }
}
