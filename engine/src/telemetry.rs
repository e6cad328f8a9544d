//! Log output
//!
//! Everything is written to stderr: stdout carries run results and the
//! `##vso` logging commands a pipeline agent parses.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Variable every Azure Pipelines agent exports to task processes
const AGENT_MARKER: &str = "TF_BUILD";

/// Shape of the log lines on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human output for local debug builds
    Pretty,
    /// One plain line per event, no colour or clock; the agent stamps lines itself
    Compact,
    /// One JSON object per event with the current span
    Json,
}

impl LogFormat {
    /// `--json` forces JSON; a pipeline agent gets compact lines; otherwise
    /// debug builds are pretty and release builds emit JSON.
    pub fn select(json_output: bool, on_agent: bool) -> Self {
        if json_output {
            LogFormat::Json
        } else if on_agent {
            LogFormat::Compact
        } else if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }

    /// [`Self::select`] against the current process
    pub fn detect(json_output: bool) -> Self {
        let on_agent = std::env::var(AGENT_MARKER).is_ok_and(|v| v.eq_ignore_ascii_case("true"));
        Self::select(json_output, on_agent)
    }
}

/// Default filter for a level; HTTP internals stay at warn
pub fn filter_directive(log_level: &str) -> String {
    format!(
        "{level},waypoint_engine={level},hyper=warn,rustls=warn",
        level = log_level
    )
}

/// Install the global subscriber. `RUST_LOG` replaces the level-derived
/// filter. A second call leaves the first subscriber in place.
pub fn init_telemetry(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Log subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection() {
        assert_eq!(LogFormat::select(true, true), LogFormat::Json);
        assert_eq!(LogFormat::select(true, false), LogFormat::Json);
        assert_eq!(LogFormat::select(false, true), LogFormat::Compact);

        let local = LogFormat::select(false, false);
        if cfg!(debug_assertions) {
            assert_eq!(local, LogFormat::Pretty);
        } else {
            assert_eq!(local, LogFormat::Json);
        }
    }

    #[test]
    fn test_filter_directive_parses() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("debug,waypoint_engine=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
