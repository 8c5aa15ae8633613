//! Production configuration system
//!
//! Provides configuration management with:
//! - Runtime defaults
//! - Config file loading (`basic` feature)
//! - Environment variable overrides
//! - Validation
//!
//! [`Config`] holds the defaults for a run. [`RunConfig::build`] merges it with
//! the values given on the command line into the explicit value passed to the
//! report pipeline, so nothing below `main` reads the environment.

use crate::aggregator::{AggregateOptions, WindowMode, DEFAULT_MIN_DURATION_SECS};
use crate::file_discovery::DEFAULT_FILE_PATTERN;
use crate::models::DateWindow;
use crate::parser::MountPointFilter;
use crate::reports::OutputTarget;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_LOG_DIRECTORY: &str = "/var/log/icecast2";
pub const DEFAULT_MOUNT_POINT: &str = "stream";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Input and output locations
    pub paths: PathsConfig,

    /// Which logs and lines are read
    pub ingest: IngestConfig,

    /// Report contents
    pub report: ReportConfig,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding Icecast `access.log*` files
    pub log_directory: PathBuf,
    /// Where loose report files are written
    pub output_directory: PathBuf,
    /// Where this tool writes its own logs when `logging.output` is `file` or `both`
    pub app_log_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub file_pattern: String,
    /// Lines from these addresses (monitoring probes, relays) are dropped
    pub excluded_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub mount_points: Vec<String>,
    pub min_duration_secs: u64,
    pub strict_window: bool,
    pub report_in_utc: bool,
    /// Offset east of UTC at which operator dates denote midnight
    pub window_utc_offset_minutes: i32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from(DEFAULT_LOG_DIRECTORY),
            output_directory: PathBuf::from("."),
            app_log_directory: PathBuf::from("logs"),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            excluded_addresses: vec!["127.0.0.1".to_string()],
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mount_points: vec![DEFAULT_MOUNT_POINT.to_string()],
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            strict_window: false,
            report_in_utc: false,
            window_utc_offset_minutes: 0,
        }
    }
}

impl LoggingConfig {
    /// Level after applying `-v` / `-d` from the command line.
    pub fn effective_level(&self, verbose: u8, debug: bool) -> String {
        if debug || verbose >= 2 {
            "debug".to_string()
        } else if verbose == 1 {
            "info".to_string()
        } else {
            self.level.clone()
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// Nothing is logged here since the subscriber depends on the result; call
    /// [`Config::log_diagnostics`] once logging is initialised.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let source = match explicit_file {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_file(),
        };
        let mut config = match &source {
            Some(path) => Self::load_from_file(path)?,
            None => Config::default(),
        };
        config.source = source;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn discover_file() -> Option<PathBuf> {
        let config_paths = [
            PathBuf::from("sx-report.toml"),
            PathBuf::from(".sx-report.toml"),
            dirs::config_dir()
                .map(|d| d.join("sx-report").join("config.toml"))
                .unwrap_or_default(),
        ];

        config_paths.into_iter().find(|path| path.is_file())
    }

    /// Settings that are allowed but probably not intended.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.report.min_duration_secs == 0 {
            warnings.push("Minimum session duration is 0, probe requests will be reported".into());
        }
        warnings
    }

    /// Report where the configuration came from and any [`Config::warnings`].
    pub fn log_diagnostics(&self) {
        match &self.source {
            Some(path) => info!(config_file = %path.display(), "Loaded configuration from file"),
            None => info!("No configuration file found, using defaults"),
        }
        for warning in self.warnings() {
            warn!("{}", warning);
        }
    }

    /// Load configuration from TOML file
    #[cfg(feature = "basic")]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    #[cfg(not(feature = "basic"))]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        bail!(
            "Config file {} given but config file support is disabled (enable the `basic` feature)",
            path.display()
        )
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; the environment is one source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Logging overrides
        if let Some(val) = lookup("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Some(val) = lookup("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Path overrides
        if let Some(val) = lookup("ICECAST_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }
        if let Some(val) = lookup("SX_REPORT_OUTPUT_DIR") {
            self.paths.output_directory = PathBuf::from(val);
        }
        if let Some(val) = lookup("SX_REPORT_APP_LOG_DIR") {
            self.paths.app_log_directory = PathBuf::from(val);
        }

        // Ingest overrides
        if let Some(val) = lookup("SX_REPORT_EXCLUDED_ADDRESSES") {
            self.ingest.excluded_addresses = split_list(&val);
        }

        // Report overrides
        if let Some(val) = lookup("SX_REPORT_MOUNTS") {
            self.report.mount_points = split_list(&val);
        }
        if let Some(val) = lookup("SX_REPORT_MIN_DURATION") {
            self.report.min_duration_secs = val
                .trim()
                .parse()
                .context("Invalid SX_REPORT_MIN_DURATION")?;
        }
        if let Some(val) = lookup("SX_REPORT_STRICT_WINDOW") {
            self.report.strict_window = val
                .trim()
                .parse()
                .context("Invalid SX_REPORT_STRICT_WINDOW")?;
        }
        if let Some(val) = lookup("SX_REPORT_IN_UTC") {
            self.report.report_in_utc = val.trim().parse().context("Invalid SX_REPORT_IN_UTC")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            bail!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            );
        }
        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            bail!(
                "Log output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            );
        }

        if self.report.mount_points.iter().all(|m| m.trim().is_empty()) {
            bail!("At least one default mount point must be configured");
        }

        if self.report.window_utc_offset_minutes.abs() >= 24 * 60 {
            bail!(
                "Window UTC offset must be within +/-1439 minutes, got {}",
                self.report.window_utc_offset_minutes
            );
        }

        Ok(())
    }
}

/// Values supplied on the command line for one run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub start: String,
    pub end: String,
    pub log_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub zip_file: Option<PathBuf>,
    pub mount_points: Option<Vec<String>>,
    pub min_duration_secs: Option<u64>,
    pub strict_window: bool,
}

/// Everything the report pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub window: DateWindow,
    pub mount_points: MountPointFilter,
    pub log_directory: PathBuf,
    pub output: OutputTarget,
    pub file_pattern: String,
    pub excluded_addresses: Vec<String>,
    pub aggregate: AggregateOptions,
}

impl RunConfig {
    pub fn build(config: &Config, request: RunRequest) -> Result<Self> {
        let output = match (request.output_directory, request.zip_file) {
            (Some(_), Some(_)) => bail!("--output-dir and --zip-file cannot be used together"),
            (None, Some(zip)) => OutputTarget::Archive(zip),
            (Some(dir), None) => OutputTarget::Directory(dir),
            (None, None) => OutputTarget::Directory(config.paths.output_directory.clone()),
        };

        let window = DateWindow::parse(
            &request.start,
            &request.end,
            config.report.window_utc_offset_minutes,
        )?;

        let mount_points = MountPointFilter::new(
            request
                .mount_points
                .as_ref()
                .unwrap_or(&config.report.mount_points),
        )?;

        let window_mode = if request.strict_window || config.report.strict_window {
            WindowMode::Strict
        } else {
            WindowMode::Historical
        };

        Ok(Self {
            window,
            mount_points,
            log_directory: request
                .log_directory
                .unwrap_or_else(|| config.paths.log_directory.clone()),
            output,
            file_pattern: config.ingest.file_pattern.clone(),
            excluded_addresses: config.ingest.excluded_addresses.clone(),
            aggregate: AggregateOptions {
                min_duration_secs: request
                    .min_duration_secs
                    .unwrap_or(config.report.min_duration_secs),
                window_mode,
                report_in_utc: config.report.report_in_utc,
            },
        })
    }
}
