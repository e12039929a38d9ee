//! Tracing subscriber setup.
//!
//! Logs go to stderr so the session owns stdout.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable read by both the CLI and the staged child.
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";

/// Output format of log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl LogFormat {
    /// Reads the format from the environment; the staged child has no CLI.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .as_deref()
            .map_or(Self::Text, Self::from_env_value)
    }

    /// Parses a `BURROW_LOG_FORMAT` value; anything but `json` is text.
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Value exported to the staged child so it logs the same way.
    pub const fn env_value(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_value_selects_the_same_format() {
        for format in [LogFormat::Text, LogFormat::Json] {
            assert_eq!(LogFormat::from_env_value(format.env_value()), format);
        }
    }

    #[test]
    fn unknown_values_fall_back_to_text() {
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("pretty"), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(""), LogFormat::Text);
    }
}
