use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;

use icecast_sx_report::analyzer::SxReportAnalyzer;
use icecast_sx_report::config::{Config, RunConfig, RunRequest};
use icecast_sx_report::display::SummaryDisplay;
use icecast_sx_report::logging::init_logging;

#[derive(Parser)]
#[command(name = "icecast-sx-report")]
#[command(about = "Build SoundExchange listener reports from Icecast access logs")]
#[command(version)]
struct Cli {
    /// First day of the report window (DD/Mon/YYYY)
    #[arg(short, long)]
    start: String,
    /// Last day of the report window, inclusive (DD/Mon/YYYY)
    #[arg(short, long)]
    end: String,
    /// Directory holding Icecast access logs [env: ICECAST_LOG_DIR]
    #[arg(short, long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
    /// Directory for report files [env: SX_REPORT_OUTPUT_DIR]
    #[arg(short, long = "output-dir", value_name = "DIR", conflicts_with = "zip_file")]
    output_dir: Option<PathBuf>,
    /// Write all reports into this zip archive instead of a directory
    #[arg(short, long = "zip-file", value_name = "FILE")]
    zip_file: Option<PathBuf>,
    /// Comma-separated mount points to report [env: SX_REPORT_MOUNTS]
    #[arg(short, long = "mount-points", value_delimiter = ',', value_name = "MOUNTS")]
    mount_points: Option<Vec<String>>,
    /// Drop sessions shorter than this many seconds
    #[arg(long, value_name = "SECS")]
    min_duration: Option<u64>,
    /// Only report sessions that connected inside the window
    #[arg(long)]
    strict_window: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// More diagnostics (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Debug diagnostics
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        handle_error(e, json);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let level = config.logging.effective_level(cli.verbose, cli.debug);
    let _log_guard = init_logging(&config.logging, &level, &config.paths.app_log_directory)?;
    config.log_diagnostics();

    let run = RunConfig::build(
        &config,
        RunRequest {
            start: cli.start,
            end: cli.end,
            log_directory: cli.log_dir,
            output_directory: cli.output_dir,
            zip_file: cli.zip_file,
            mount_points: cli.mount_points,
            min_duration_secs: cli.min_duration,
            strict_window: cli.strict_window,
        },
    )?;

    let summary = SxReportAnalyzer::new(run)?.run()?;
    SummaryDisplay::new().show(&summary, cli.json)
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
