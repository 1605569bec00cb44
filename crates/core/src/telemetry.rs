//! Tracing subscriber setup for embedding applications.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Build the filter directive from the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(config.level.trim().to_ascii_lowercase())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns an error when a subscriber is
/// already set, which callers may ignore in tests.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), String> {
    let filter = env_filter(config);
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::env_filter;
    use crate::config::{LogFormat, LoggingConfig};

    #[test]
    fn filter_uses_configured_level() {
        let config = LoggingConfig { level: "WARN".to_string(), format: LogFormat::Compact };
        let filter = env_filter(&config);
        assert_eq!(filter.to_string(), "warn");
    }
}
