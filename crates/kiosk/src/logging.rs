//! Log sink setup

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{KioskError, Result};

/// Map a configured level name to a filter directive.
/// Unknown names log everything down to debug.
pub fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" | "FATAL" | "PANIC" => "error",
        _ => "debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str, logfile: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    match logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| KioskError::Config(format!("cannot open logfile {}: {}", path.display(), e)))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("warn"), "warn");
        assert_eq!(level_directive("Info"), "info");
        assert_eq!(level_directive("FATAL"), "error");
        assert_eq!(level_directive("PANIC"), "error");
        assert_eq!(level_directive("chatty"), "debug");
    }

    #[test]
    fn test_unwritable_logfile() {
        let err = init("info", Some(Path::new("/nonexistent/dir/exhibit.log"))).unwrap_err();
        assert!(matches!(err, KioskError::Config(_)));
    }
}
