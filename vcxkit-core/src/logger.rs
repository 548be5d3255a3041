use std::sync::{Arc, OnceLock};

/// Trait representing a logger that can log messages at various levels.
///
/// Implemented on the foreign side and installed once with [`set_logger`]. `VcxKit`
/// logs through the `log` facade; every record is forwarded here.
///
/// # Examples
///
/// ```rust
/// use vcxkit_core::logger::{Logger, LogLevel};
///
/// struct MyLogger;
///
/// impl Logger for MyLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// class VcxKitLoggerBridge: VcxKit.Logger {
///     static let shared = VcxKitLoggerBridge()
///
///     func log(level: VcxKit.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// public func setupVcxKitLogger() {
///     VcxKit.setLogger(logger: VcxKitLoggerBridge.shared)
/// }
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Designates potentially harmful situations.
    Warn,
    /// Designates error events that might still allow the application to continue running.
    Error,
}

/// Forwards `log` records to the foreign [`Logger`].
struct ForeignLogger;

/// Debug and trace records are only forwarded from our own crates; the engine and its
/// dependencies are too chatty at those levels.
fn is_forwarded(metadata: &log::Metadata) -> bool {
    let is_debug_or_trace =
        metadata.level() == log::Level::Debug || metadata.level() == log::Level::Trace;
    !is_debug_or_trace || metadata.target().starts_with("vcxkit")
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_forwarded(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !is_forwarded(record.metadata()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Call once, before any `VcxKit` operation. Later calls keep the first logger.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    if let Err(e) = log::set_logger(&LOGGER) {
        eprintln!("Failed to set logger: {e}");
        return;
    }
    log::set_max_level(log::LevelFilter::Trace);
}

/// Installs a `tracing` fmt subscriber for hosts without a foreign logger (Rust
/// programs, the Node addon, tests). `filter` uses `EnvFilter` syntax and falls back to
/// `RUST_LOG`, then to `info`. `log` records are bridged into `tracing`.
///
/// Returns `false` when a global subscriber or logger was already installed.
pub fn init_tracing(filter: Option<&str>) -> bool {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    if tracing_log::LogTracer::init().is_err() {
        return false;
    }
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(level: log::Level, target: &str) -> log::Metadata<'_> {
        log::Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn test_debug_only_forwarded_from_vcxkit() {
        assert!(is_forwarded(&metadata(log::Level::Debug, "vcxkit_core::adapter")));
        assert!(!is_forwarded(&metadata(log::Level::Debug, "tokio::runtime")));
        assert!(is_forwarded(&metadata(log::Level::Warn, "tokio::runtime")));
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
    }
}
