//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::state::session::DEFAULT_DURATION_SECONDS;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "kompeito-dwell")]
#[command(about = "Wall-clock dwell timer and reward bookkeeping for a place-visit game")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "KOMPEITO_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "KOMPEITO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// How long a visit must last before the user may leave, in seconds
    #[arg(long, env = "KOMPEITO_DWELL_SECONDS", default_value_t = DEFAULT_DURATION_SECONDS)]
    pub dwell_seconds: u64,

    /// Interval between countdown recomputations, in milliseconds
    #[arg(long, env = "KOMPEITO_TICK_MILLIS", default_value = "1000")]
    pub tick_millis: u64,

    /// JSON file backing the persistent key-value store
    #[arg(long, env = "KOMPEITO_DATA_FILE", default_value = "kompeito-store.json")]
    pub data_file: PathBuf,

    /// Kompeito awarded for each posted review
    #[arg(long, env = "KOMPEITO_PER_REVIEW", default_value = "10")]
    pub kompeito_per_review: u64,

    /// Display name used when a profile is created
    #[arg(long, env = "KOMPEITO_USERNAME", default_value = "spanyan")]
    pub username: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments and environment
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Timer settings derived from the CLI
    pub fn dwell_config(&self) -> DwellConfig {
        DwellConfig {
            total_duration_seconds: self.dwell_seconds,
            tick_interval: Duration::from_millis(self.tick_millis.max(1)),
        }
    }
}

/// Settings consumed by the dwell timer core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellConfig {
    /// Seconds a dwell session must last
    pub total_duration_seconds: u64,
    /// Period of the countdown ticker
    pub tick_interval: Duration,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            total_duration_seconds: DEFAULT_DURATION_SECONDS,
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_ten_minute_visit() {
        let config = Config::try_parse_from(["kompeito-dwell"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:20554");
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.dwell_config(), DwellConfig::default());
    }

    #[test]
    fn zero_tick_interval_is_clamped() {
        let config =
            Config::try_parse_from(["kompeito-dwell", "--tick-millis", "0", "--dwell-seconds", "30", "-v"])
                .unwrap();
        let dwell = config.dwell_config();
        assert_eq!(dwell.total_duration_seconds, 30);
        assert_eq!(dwell.tick_interval, Duration::from_millis(1));
        assert_eq!(config.log_level(), "debug");
    }
}
