//! Configuration management.
//!
//! Reads `~/.signal-group-bot/config.json`:
//!
//! ```json
//! {
//!   "signal": {
//!     "number": "+4917012345678",
//!     "endpoint": "127.0.0.1:7583",
//!     "default_country_code": "49",
//!     "admin_users": ["017012345678"],
//!     "default_message": "send 'bot help' for a list of commands"
//!   },
//!   "database": { "url": "sqlite:///var/lib/signal-group-bot/groups.db" }
//! }
//! ```
//!
//! Falls back to environment variables if no config file exists.

use crate::error::ConfigError;
use crate::transport::signal_cli::DEFAULT_ENDPOINT;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Default SQLite database location.
pub fn default_database_path() -> PathBuf {
    config_dir().join("groups.db")
}

/// Get the bot's config directory path.
fn config_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".signal-group-bot"))
        .unwrap_or_else(|| PathBuf::from(".signal-group-bot"))
}

fn default_database_url() -> String {
    format!("sqlite://{}", default_database_path().display())
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_message() -> String {
    "I didn't understand that. Send 'bot help' for a list of commands.".to_string()
}

// ============================================================================
// File Format
// ============================================================================

/// JSON configuration file structure.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    signal: SignalConfigFile,
    #[serde(default)]
    database: Option<DatabaseConfigFile>,
}

#[derive(Debug, Deserialize)]
struct SignalConfigFile {
    #[serde(default)]
    number: Option<String>,
    #[serde(default = "default_endpoint")]
    endpoint: String,
    default_country_code: CountryCodeValue,
    #[serde(default)]
    admin_users: AdminUsersValue,
    #[serde(default = "default_message")]
    default_message: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfigFile {
    url: String,
}

/// Country code that can be either string or integer in JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CountryCodeValue {
    String(String),
    Integer(u32),
}

impl CountryCodeValue {
    fn to_digits(&self) -> Result<String, ConfigError> {
        let raw = match self {
            CountryCodeValue::String(s) => s.trim().trim_start_matches('+').to_string(),
            CountryCodeValue::Integer(i) => i.to_string(),
        };
        validate_country_code(raw)
    }
}

/// Admin list that can be a JSON array or one space-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AdminUsersValue {
    List(Vec<String>),
    Joined(String),
}

impl Default for AdminUsersValue {
    fn default() -> Self {
        AdminUsersValue::List(Vec::new())
    }
}

impl AdminUsersValue {
    fn into_list(self) -> Vec<String> {
        match self {
            AdminUsersValue::List(list) => list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            AdminUsersValue::Joined(joined) => split_admins(&joined),
        }
    }
}

fn split_admins(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}

fn validate_country_code(digits: String) -> Result<String, ConfigError> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidValue(format!(
            "default_country_code must be digits, got {:?}",
            digits
        )));
    }
    Ok(digits)
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Signal side of the configuration.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Bot's own number; only sent to multi-account daemons.
    pub number: Option<String>,
    /// signal-cli JSON-RPC endpoint (`host:port`).
    pub endpoint: String,
    /// Country code digits used to rewrite a leading `0`.
    pub default_country_code: String,
    /// People allowed to use administrative commands.
    pub admin_users: Vec<String>,
    /// Reply for anything that is not a recognised command.
    pub default_message: String,
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub signal: SignalConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from JSON file, falling back to environment variables.
    ///
    /// Search order:
    /// 1. Provided config_path (if any)
    /// 2. `~/.signal-group-bot/config.json`
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::from_json(&path);
        }

        let path = default_config_path();
        if path.exists() {
            return Self::from_json(&path);
        }

        Self::from_env()
    }

    /// Load configuration from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let signal = file.signal;

        Ok(Self {
            signal: SignalConfig {
                number: signal.number.filter(|n| !n.trim().is_empty()),
                endpoint: signal.endpoint,
                default_country_code: signal.default_country_code.to_digits()?,
                admin_users: signal.admin_users.into_list(),
                default_message: signal.default_message,
            },
            database: DatabaseConfig {
                url: file
                    .database
                    .map(|d| d.url)
                    .unwrap_or_else(default_database_url),
            },
        })
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file (silently ignore if not found)
        let _ = dotenvy::from_path(config_dir().join(".env"));

        let country_code = env::var("SIGNAL_DEFAULT_COUNTRY_CODE")
            .map_err(|_| ConfigError::MissingEnvVar("SIGNAL_DEFAULT_COUNTRY_CODE".to_string()))?;

        Ok(Self {
            signal: SignalConfig {
                number: env::var("SIGNAL_NUMBER").ok().filter(|n| !n.trim().is_empty()),
                endpoint: env::var("SIGNAL_ENDPOINT").unwrap_or_else(|_| default_endpoint()),
                default_country_code: validate_country_code(
                    country_code.trim().trim_start_matches('+').to_string(),
                )?,
                admin_users: env::var("SIGNAL_ADMIN_USERS")
                    .map(|s| split_admins(&s))
                    .unwrap_or_default(),
                default_message: env::var("SIGNAL_DEFAULT_MESSAGE")
                    .unwrap_or_else(|_| default_message()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, content).unwrap();
        (dir, config_path)
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"{
                "signal": {
                    "number": "+4917000000",
                    "endpoint": "10.0.0.5:7583",
                    "default_country_code": "49",
                    "admin_users": ["0170111", "+49170222"],
                    "default_message": "nope"
                },
                "database": { "url": "sqlite:///tmp/groups.db" }
            }"#,
        );

        let config = Config::from_json(&path).unwrap();
        assert_eq!(config.signal.number.as_deref(), Some("+4917000000"));
        assert_eq!(config.signal.endpoint, "10.0.0.5:7583");
        assert_eq!(config.signal.default_country_code, "49");
        assert_eq!(config.signal.admin_users, vec!["0170111", "+49170222"]);
        assert_eq!(config.signal.default_message, "nope");
        assert_eq!(config.database.url, "sqlite:///tmp/groups.db");
    }

    #[test]
    fn test_defaults_applied() {
        let (_dir, path) = write_config(r#"{"signal": {"default_country_code": "49"}}"#);

        let config = Config::from_json(&path).unwrap();
        assert!(config.signal.number.is_none());
        assert_eq!(config.signal.endpoint, DEFAULT_ENDPOINT);
        assert!(config.signal.admin_users.is_empty());
        assert!(config.signal.default_message.contains("bot help"));
        assert!(config.database.url.starts_with("sqlite://"));
        assert!(config.database.url.ends_with("groups.db"));
    }

    #[test]
    fn test_admin_users_space_separated() {
        let (_dir, path) = write_config(
            r#"{"signal": {"default_country_code": "49", "admin_users": "0170111  +49170222 "}}"#,
        );

        let config = Config::from_json(&path).unwrap();
        assert_eq!(config.signal.admin_users, vec!["0170111", "+49170222"]);
    }

    #[test]
    fn test_country_code_forms() {
        for raw in [r#""49""#, r#""+49""#, "49"] {
            let (_dir, path) =
                write_config(&format!(r#"{{"signal": {{"default_country_code": {}}}}}"#, raw));
            let config = Config::from_json(&path).unwrap();
            assert_eq!(config.signal.default_country_code, "49", "{}", raw);
        }
    }

    #[test]
    fn test_invalid_country_code() {
        let (_dir, path) = write_config(r#"{"signal": {"default_country_code": "4x"}}"#);
        assert!(matches!(
            Config::from_json(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_missing_country_code() {
        let (_dir, path) = write_config(r#"{"signal": {"number": "+49170"}}"#);
        assert!(matches!(
            Config::from_json(&path),
            Err(ConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_config_file_not_found() {
        let result = Config::from_json(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let result = Config::load(Some(PathBuf::from("/nonexistent/path.json")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
