//! Log output setup for `triage-plan`.
//!
//! Events from the triage crates are shown at the requested level while
//! third-party crates stay at `warn`. `RUST_LOG` replaces that default
//! entirely. Output always goes to stderr; stdout belongs to command output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level.
const TRIAGE_TARGETS: [&str; 2] = ["triage_core", "triage_plan"];

/// Shape of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Text,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(TRIAGE_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one is left in place.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let text = (format == LogFormat::Text)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_triage_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,triage_core=debug,triage_plan=debug"
        );
        assert_eq!(
            default_directives(Level::INFO),
            "warn,triage_core=info,triage_plan=info"
        );
    }

    #[test]
    fn test_default_directives_parse_as_filter() {
        EnvFilter::try_new(default_directives(Level::TRACE)).expect("valid directives");
    }

    #[test]
    fn test_log_format_from_flag() {
        assert_eq!(LogFormat::from_json_flag(true), LogFormat::Json);
        assert_eq!(LogFormat::from_json_flag(false), LogFormat::Text);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_second_init_keeps_existing_subscriber() {
        init_tracing(LogFormat::Text, Level::INFO);
        assert!(!init_tracing(LogFormat::Json, Level::DEBUG));
        tracing::info!("still logging");
    }
}
