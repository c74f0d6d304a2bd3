//! FSx tiering estimator CLI
//!
//! Collects CloudWatch metrics for one FSx for NetApp ONTAP volume and
//! prints how its bytes would spread across S3 Intelligent-Tiering tiers.

mod commands;
mod config;
mod output;

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tiering_lib::TieringError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that switches log output to JSON
const LOG_JSON_ENV: &str = "FSX_TIERING_LOG_JSON";

/// FSx for NetApp ONTAP to S3 Intelligent-Tiering estimator
#[derive(Parser)]
#[command(name = "fsx-tiering")]
#[command(
    author,
    version,
    about = "Estimate S3 Intelligent-Tiering placement for an FSx for NetApp ONTAP volume",
    long_about = None
)]
pub struct Cli {
    /// FSx file system ID (e.g. fs-0123456789abcdef0)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub fsx_id: String,

    /// FSx volume ID (e.g. fsvol-0123456789abcdef0)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub volume_id: String,

    /// AWS region the file system lives in
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub region: String,

    /// Named AWS profile used for credentials
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub profile: String,

    /// Configuration file (defaults to ~/.config/fsx-tiering/config.toml when present)
    #[arg(long, env = "FSX_TIERING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Write collector metrics in Prometheus text format to this file
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::estimate::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            if let Some(hint) = err.downcast_ref::<TieringError>().and_then(|e| e.hint()) {
                output::print_hint(hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so the report on stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var(LOG_JSON_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
