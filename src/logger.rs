use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Logs to stderr; `RUST_LOG` takes precedence over `log_spec`.
pub fn init(log_spec: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(log_spec)?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
}
