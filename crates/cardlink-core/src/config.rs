//! Terminal configuration.
//!
//! Configuration is read once at boot from a TOML file. Every section and
//! every key is optional; missing values fall back to the defaults in
//! [`constants`](crate::constants).
//!
//! ```toml
//! [modem]
//! probe_attempts = 8
//! command_timeout_ms = 5000
//! poll_interval_ms = 10000
//!
//! [http]
//! url = "validation.example.com"
//! base_path = "/cards/"
//!
//! [[apn.table]]
//! operator = "airtel"
//! apn = "airtelgprs.com"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::constants::*;
use crate::types::HttpPath;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub modem: ModemConfig,
    pub http: HttpConfig,
    pub reader: ReaderConfig,
    pub apn: ApnConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Liveness probes issued at boot.
    pub probe_attempts: u8,
    /// Upper bound for one AT operation.
    pub command_timeout_ms: u64,
    /// Period of the connectivity poll timer.
    pub poll_interval_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ModemConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Validation server host handed to the modem's HTTP GET.
    pub url: String,
    /// Fixed prefix the card identifier is appended to.
    pub base_path: String,
    /// Wait for a card event before draining stray reader input.
    pub receive_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HTTP_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
        }
    }
}

impl HttpConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub read_timeout_ms: u64,
    pub channel_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ReaderConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// One operator-substring to APN mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApnEntry {
    pub operator: String,
    pub apn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApnConfig {
    pub table: Vec<ApnEntry>,
}

impl Default for ApnConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_APN_TABLE
                .iter()
                .map(|(operator, apn)| ApnEntry {
                    operator: operator.to_string(),
                    apn: apn.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl TerminalConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: TerminalConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the terminal unusable.
    pub fn validate(&self) -> Result<()> {
        if self.reader.channel_capacity == 0 {
            return Err(Error::Config("reader.channel_capacity must be > 0".into()));
        }
        if self.reader.read_timeout_ms == 0 {
            return Err(Error::Config("reader.read_timeout_ms must be > 0".into()));
        }
        if self.http.receive_timeout_ms == 0 {
            return Err(Error::Config("http.receive_timeout_ms must be > 0".into()));
        }
        if self.modem.command_timeout_ms == 0 {
            return Err(Error::Config("modem.command_timeout_ms must be > 0".into()));
        }
        if self.modem.poll_interval_ms == 0 {
            return Err(Error::Config("modem.poll_interval_ms must be > 0".into()));
        }
        if self.http.url.trim().is_empty() {
            return Err(Error::Config("http.url must not be empty".into()));
        }

        let wire_len = HttpPath::wire_len_for(&self.http.base_path);
        if wire_len > MAX_PATH_LEN {
            return Err(Error::PathTooLong {
                len: wire_len,
                max: MAX_PATH_LEN,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TerminalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.modem.probe_attempts, 8);
        assert_eq!(config.reader.channel_capacity, 10);
        assert_eq!(config.apn.table.len(), 8);
        assert_eq!(config.apn.table[0].operator, "airtel");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TerminalConfig::from_toml("").unwrap();
        assert_eq!(config, TerminalConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = TerminalConfig::from_toml(
            r#"
            [modem]
            poll_interval_ms = 2500

            [http]
            url = "validator.local"

            [[apn.table]]
            operator = "jio"
            apn = "jionet"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.modem.poll_interval(), Duration::from_millis(2500));
        assert_eq!(config.modem.probe_attempts, DEFAULT_PROBE_ATTEMPTS);
        assert_eq!(config.http.url, "validator.local");
        assert_eq!(config.http.base_path, DEFAULT_BASE_PATH);
        assert_eq!(config.apn.table.len(), 1);
        assert_eq!(config.apn.table[0].apn, "jionet");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = TerminalConfig::from_toml("[reader]\nchannel_capacity = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_long_base_path_rejected() {
        let toml = format!("[http]\nbase_path = \"{}\"\n", "x".repeat(MAX_PATH_LEN));
        let result = TerminalConfig::from_toml(&toml);
        assert!(matches!(result, Err(Error::PathTooLong { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = TerminalConfig::from_toml("[modem\nprobe_attempts = ");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }
}
