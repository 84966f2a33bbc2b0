use crate::error::{Result, ServiceError};
use chrono::Local;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter, Record};
use std::io::Write;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

/// Level names accepted by `--log-level`
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Installs the colored `log` backend used by the harvester and the CLI.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init(log_level: &str) -> Result<()> {
    let env = Env::default()
        .filter_or("RUST_LOG", parse_log_level(log_level).as_str())
        .write_style_or("RUST_LOG_STYLE", "auto");

    Builder::from_env(env)
        .format(|buf, record| writeln!(buf, "{}", format_log(record)))
        .try_init()
        .map_err(|e| ServiceError::Config(format!("logger already installed: {}", e)))
}

/// Installs a `tracing` subscriber for the HTTP server.
///
/// Request spans from the trace layer go through this subscriber; `log`
/// records from library code are forwarded to it as well.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let level = parse_log_level(log_level).as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repodiagram={level},tower_http={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ServiceError::Config(format!("tracing subscriber already installed: {}", e)))
}

/// Renders one record as `[timestamp] LEVEL [target] message`
pub fn format_log(record: &Record) -> String {
    let level = match record.level() {
        Level::Error => Paint::red("ERROR").bold(),
        Level::Warn => Paint::yellow("WARN ").bold(),
        Level::Info => Paint::cyan("INFO ").bold(),
        Level::Debug => Paint::blue("DEBUG").bold(),
        Level::Trace => Paint::new("TRACE"),
    };

    let target = match record.target() {
        "" => record.module_path().unwrap_or("unknown"),
        target => target,
    };

    format!(
        "[{}] {} [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        record.args()
    )
}

/// Maps a level name to a filter, falling back to `Info` for unknown names
pub fn parse_log_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}
