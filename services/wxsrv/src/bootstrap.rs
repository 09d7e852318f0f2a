//! Service bootstrap: command line, configuration and logging

use crate::config::{AppConfig, ConfigIssue, LoggingConfig};
use clap::Parser;
use common::LogConfig;
use errors::{WxError, WxResult};
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};

pub const SERVICE_NAME: &str = "wxsrv";

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "wxsrv",
    author,
    version,
    about = "Weather station telemetry service"
)]
pub struct Args {
    /// Configuration file (default: config/wxsrv.yaml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive, overrides the configuration
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for the rolling log file, overrides the configuration
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Disable colored console output
    #[arg(long)]
    pub no_color: bool,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    pub validate: bool,
}

pub fn load_configuration(args: &Args) -> WxResult<AppConfig> {
    AppConfig::load(args.config.as_deref()).map_err(WxError::from)
}

/// Console and optional file logging; command line wins over configuration.
pub fn init_logging(args: &Args, config: &LoggingConfig) -> WxResult<()> {
    let log_config = log_config(args, config);
    common::logging::init_with_config(log_config)
        .map_err(|e| WxError::config(format!("Failed to initialize logging: {e}")))?;
    info!("{} v{} starting", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn log_config(args: &Args, config: &LoggingConfig) -> LogConfig {
    LogConfig {
        service_name: SERVICE_NAME.to_string(),
        log_dir: args.log_dir.clone().or_else(|| config.dir.clone()),
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.level.clone()),
        enable_json: config.json,
        ansi: !args.no_color,
    }
}

/// Log each issue once
pub fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        error!("Configuration error: {issue}");
    }
}

/// Log a fatal error with its code, at the level its category calls for
pub fn report_failure(err: &WxError) {
    let info = err.to_error_info();
    let level = err.log_level();
    if level == Level::ERROR {
        error!(code = %info.code, retryable = info.retryable, "{}", info.message);
    } else if level == Level::WARN {
        warn!(code = %info.code, retryable = info.retryable, "{}", info.message);
    } else {
        debug!(code = %info.code, retryable = info.retryable, "{}", info.message);
    }
}
