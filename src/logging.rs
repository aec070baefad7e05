use log::{debug, error, info, log_enabled, Level, LevelFilter};

/// Initializes the logger with `level` as the default when `RUST_LOG` is unset.
///
/// Safe to call more than once; only the first call installs a logger.
pub fn init_logger_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_keeps_first_logger() {
        init_logger_with_level(LevelFilter::Debug);
        init_logger_with_level(LevelFilter::Trace);
        log_error("error");
        log_info("info");
        log_debug("debug");
    }
}
