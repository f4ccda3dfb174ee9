//! Telemetry initialization.
//!
//! Controlled by `SCENELOG_TRACE`:
//! - unset → no subscriber (tracing disabled, zero overhead)
//! - `"stderr"` → JSON spans/events to stderr
//! - `"pretty"` → human-readable events to stderr
//!
//! The level filter comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable selecting the telemetry output.
pub const TRACE_ENV: &str = "SCENELOG_TRACE";

/// Which subscriber [`init`] installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelemetryMode {
    Disabled,
    Json,
    Pretty,
}

impl TelemetryMode {
    /// Parse the value of [`TRACE_ENV`].
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Disabled,
            Some("stderr" | "json") => Self::Json,
            Some("pretty") => Self::Pretty,
            Some(other) => {
                eprintln!("warning: {TRACE_ENV}={other} not recognised (use stderr or pretty)");
                Self::Disabled
            }
        }
    }
}

/// Guard returned by [`init`]. Hold it in `main()` until exit.
#[must_use]
pub struct TelemetryGuard {
    mode: TelemetryMode,
}

impl TelemetryGuard {
    #[must_use]
    pub const fn mode(&self) -> TelemetryMode {
        self.mode
    }
}

/// Initialize telemetry based on `SCENELOG_TRACE`.
pub fn init() -> TelemetryGuard {
    let mode = TelemetryMode::from_env_value(std::env::var(TRACE_ENV).ok().as_deref());
    match mode {
        TelemetryMode::Disabled => {}
        TelemetryMode::Json => init_json(),
        TelemetryMode::Pretty => init_pretty(),
    }
    TelemetryGuard { mode }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON spans/events to stderr via tracing-subscriber's JSON formatter.
fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .init();
}

fn init_pretty() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_env_value() {
        assert_eq!(TelemetryMode::from_env_value(None), TelemetryMode::Disabled);
        assert_eq!(TelemetryMode::from_env_value(Some("")), TelemetryMode::Disabled);
        assert_eq!(TelemetryMode::from_env_value(Some("stderr")), TelemetryMode::Json);
        assert_eq!(TelemetryMode::from_env_value(Some("pretty")), TelemetryMode::Pretty);
        assert_eq!(TelemetryMode::from_env_value(Some("otlp")), TelemetryMode::Disabled);
    }
}
