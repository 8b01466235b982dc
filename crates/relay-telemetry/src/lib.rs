//! # relay-telemetry
//!
//! One-shot `tracing` subscriber setup. `RUST_LOG` wins over the configured
//! levels when set.

#![deny(unsafe_code)]

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by `RUST_LOG`.
    pub log_level: Level,
    /// Per-module level overrides (e.g. `"relay_core"` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// The `EnvFilter` directive string built from this config.
    pub fn filter_directive(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

/// Parse a level name such as `"debug"` (case-insensitive).
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse().ok()
}

/// Initialize the global subscriber. Call once at startup.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    match tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            eprintln!("relay-telemetry: subscriber already installed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_info_plain() {
        let cfg = TelemetryConfig::default();
        assert_eq!(cfg.log_level, Level::INFO);
        assert!(!cfg.json);
        assert_eq!(cfg.filter_directive(), "info");
    }

    #[test]
    fn module_overrides_appended() {
        let cfg = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![
                ("relay_core".into(), Level::DEBUG),
                ("relay_server".into(), Level::TRACE),
            ],
            json: true,
        };
        assert_eq!(
            cfg.filter_directive(),
            "warn,relay_core=debug,relay_server=trace"
        );
    }

    #[test]
    fn parse_level_names() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn second_init_reports_false() {
        let cfg = TelemetryConfig::default();
        let _ = init_telemetry(&cfg);
        assert!(!init_telemetry(&cfg));
    }
}
