//! log4rs setup: console, a rolling `app.log`, and a rolling `access.log` that receives the
//! `devcamper::access` target only.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

pub const ACCESS_TARGET: &str = "devcamper::access";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Initializes logging from `log4rs.yaml` in the working directory.
///
/// # Errors
/// Returns an error if the file is missing or invalid.
pub fn init() -> Result<(), BoxError> {
    log4rs::init_file("log4rs.yaml", log4rs::config::Deserializers::default())?;
    Ok(())
}

#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, name: &str, keep: u32) -> Result<RollingFileAppender, BoxError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{name}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{name}.log")), Box::new(policy))?)
}

/// Builds the logging config without installing it.
///
/// # Errors
/// Returns an error if the log directory or files cannot be created.
pub fn build_config(dir: &Path, level: LevelFilter, retention: usize) -> Result<Config, BoxError> {
    std::fs::create_dir_all(dir)?;
    let keep = u32::try_from(retention.max(1)).unwrap_or(u32::MAX);
    let console = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();
    Ok(Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("app", Box::new(rolling(dir, "app", keep)?)))
        .appender(Appender::builder().build("access", Box::new(rolling(dir, "access", keep)?)))
        .logger(Logger::builder().appender("access").additive(false).build(ACCESS_TARGET, level))
        .build(Root::builder().appender("console").appender("app").build(level))?)
}

/// Configures logging for the process.
/// - dir: base directory for logs; if None, `./logs`.
/// - level: off|error|warn|info|debug|trace
/// - retention: number of rolled files to keep
///
/// # Errors
/// Returns an error if the files cannot be created or a logger is already installed.
pub fn configure_logging(dir: Option<&Path>, level: &str, retention: usize) -> Result<(), BoxError> {
    let base = dir.map_or_else(|| PathBuf::from("logs"), Path::to_path_buf);
    log4rs::init_config(build_config(&base, parse_level(level), retention)?)?;
    Ok(())
}
