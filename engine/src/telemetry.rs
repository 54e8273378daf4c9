//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. Logs always go to
//! stderr so that command output on stdout (including `--json`) stays
//! machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for `log_level`, applied globally and to this crate
fn default_directive(log_level: &str) -> String {
    format!("{},groundwork_engine={}", log_level, log_level)
}

/// Initialize the tracing subscriber with the given log level.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
///
/// In debug builds: pretty-printed output.
/// In release builds: JSON structured output with the current span
/// (each pipeline run carries a `run` span with its `run_id`).
///
/// Calling this more than once is a no-op.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        let directive = default_directive("debug");
        assert_eq!(directive, "debug,groundwork_engine=debug");
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_telemetry_with_level("warn");
        init_telemetry_with_level("info");
    }
}
