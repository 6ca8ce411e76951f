//! Server configuration, parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use testament_core::{HeartbeatConfig, Principal};

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// General server settings
    #[serde(default)]
    pub server: ServerSection,

    /// Identity and behaviour of the switch keeper
    pub keeper: KeeperSection,

    /// Check-in reminder thresholds
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// General server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory (SQLite DB)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Check interval in seconds (default: 1 hour)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            check_interval_secs: default_check_interval(),
            log_level: default_log_level(),
        }
    }
}

/// Keeper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperSection {
    /// Principal (64 hex chars) recorded as the caller of `confirm_dead`
    pub identity: String,

    /// Fire the switch automatically once it has expired
    #[serde(default = "default_auto_confirm")]
    pub auto_confirm_dead: bool,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_check_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_confirm() -> bool {
    true
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `TESTAMENT_DATA_DIR`
    /// - `TESTAMENT_CHECK_INTERVAL`
    /// - `TESTAMENT_LOG_LEVEL`
    /// - `TESTAMENT_KEEPER_IDENTITY`
    /// - `TESTAMENT_AUTO_CONFIRM`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TESTAMENT_DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TESTAMENT_CHECK_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                self.server.check_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("TESTAMENT_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("TESTAMENT_KEEPER_IDENTITY") {
            self.keeper.identity = v;
        }
        if let Ok(v) = std::env::var("TESTAMENT_AUTO_CONFIRM") {
            if let Ok(flag) = v.parse::<bool>() {
                self.keeper.auto_confirm_dead = flag;
            }
        }
    }

    /// Path of the estate database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.server.data_dir.join("estate.db")
    }

    /// Parse the keeper identity.
    pub fn keeper_identity(&self) -> Result<Principal> {
        Principal::from_str(&self.keeper.identity)
            .with_context(|| format!("Invalid keeper.identity: {}", self.keeper.identity))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.keeper_identity()?;

        // Check interval must be at least 60 seconds
        anyhow::ensure!(
            self.server.check_interval_secs >= 60,
            "server.check_interval_secs must be >= 60"
        );

        self.heartbeat
            .validate()
            .context("Invalid [heartbeat] thresholds")?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const KEEPER: &str = "0100000000000000000000000000000000000000000000000000000000000004";

    fn minimal_toml() -> String {
        format!(
            r#"
[keeper]
identity = "{KEEPER}"
"#
        )
    }

    fn full_toml() -> String {
        format!(
            r#"
[server]
data_dir = "/custom/data"
check_interval_secs = 600
log_level = "debug"

[keeper]
identity = "{KEEPER}"
auto_confirm_dead = false

[heartbeat]
checkin_threshold = 0.3
critical_threshold = 0.8
"#
        )
    }

    fn load(toml: &str) -> ServerConfig {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", toml).unwrap();
        ServerConfig::from_file(file.path()).unwrap()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = load(&minimal_toml());
        assert_eq!(config.server.check_interval_secs, 3600); // default
        assert_eq!(config.server.data_dir, PathBuf::from("/data"));
        assert!(config.keeper.auto_confirm_dead);
        assert!((config.heartbeat.checkin_threshold - 0.5).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = load(&full_toml());
        assert_eq!(config.server.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.server.check_interval_secs, 600);
        assert_eq!(config.server.log_level, "debug");
        assert!(!config.keeper.auto_confirm_dead);
        assert!((config.heartbeat.critical_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.db_path(), PathBuf::from("/custom/data/estate.db"));
    }

    #[test]
    fn test_partial_heartbeat_section() {
        let toml = format!(
            r#"
[keeper]
identity = "{KEEPER}"

[heartbeat]
checkin_threshold = 0.25
"#
        );
        let config = load(&toml);
        assert!((config.heartbeat.checkin_threshold - 0.25).abs() < f64::EPSILON);
        assert!((config.heartbeat.critical_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = load(&minimal_toml());

        std::env::set_var("TESTAMENT_DATA_DIR", "/env/data");
        std::env::set_var("TESTAMENT_CHECK_INTERVAL", "1800");
        std::env::set_var("TESTAMENT_AUTO_CONFIRM", "false");

        config.apply_env_overrides();

        assert_eq!(config.server.data_dir, PathBuf::from("/env/data"));
        assert_eq!(config.server.check_interval_secs, 1800);
        assert!(!config.keeper.auto_confirm_dead);

        // Clean up
        std::env::remove_var("TESTAMENT_DATA_DIR");
        std::env::remove_var("TESTAMENT_CHECK_INTERVAL");
        std::env::remove_var("TESTAMENT_AUTO_CONFIRM");
    }

    #[test]
    fn test_validation_bad_identity() {
        let config = load(
            r#"
[keeper]
identity = "not-hex"
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_check_interval_too_low() {
        let mut config = load(&minimal_toml());
        config.server.check_interval_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_thresholds() {
        let mut config = load(&minimal_toml());
        config.heartbeat.critical_threshold = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_keeper_section() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server]\nlog_level = \"warn\"\n").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = load(&full_toml());
        let serialized = toml::to_string_pretty(&config).unwrap();

        // Should be valid TOML that re-parses
        let reparsed: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.keeper.identity, config.keeper.identity);
        assert_eq!(
            reparsed.server.check_interval_secs,
            config.server.check_interval_secs
        );
    }
}
