//! Logging setup for providers
//!
//! Terraform reads the plugin handshake from stdout, so log output always
//! goes to stderr. The level follows TF_LOG like the official SDKs.

use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Reads TF_LOG, falling back to Info for unset or unknown values
    pub fn from_env() -> Self {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogLevel::Info)
    }

    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global tracing subscriber. Later calls are no-ops.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let filter = EnvFilter::new(level.as_filter());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("json".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    #[serial]
    fn from_env_defaults_to_info() {
        std::env::remove_var("TF_LOG");
        assert_eq!(LogLevel::from_env(), LogLevel::Info);

        std::env::set_var("TF_LOG", "trace");
        assert_eq!(LogLevel::from_env(), LogLevel::Trace);

        std::env::set_var("TF_LOG", "nonsense");
        assert_eq!(LogLevel::from_env(), LogLevel::Info);

        std::env::remove_var("TF_LOG");
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Error);
    }
}
