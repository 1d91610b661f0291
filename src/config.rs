//! Configuration system for the mapsite service
//!
//! Settings are read from a TOML file. Secrets (the reCAPTCHA secret key and
//! the Google Maps API key) are never stored in the file; each section names
//! the environment variable that holds them and they are resolved at runtime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    pub recaptcha: RecaptchaSection,
    pub maps: MapsSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where non-AJAX form submissions are sent after success
    #[serde(default = "default_success_redirect")]
    pub success_redirect: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            success_redirect: default_success_redirect(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_success_redirect() -> String {
    "/".to_string()
}

/// SQLite database location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "mapsite.sqlite3".to_string()
}

/// reCAPTCHA verification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecaptchaSection {
    /// Public site key handed to the browser widget
    pub site_key: String,
    /// Environment variable containing the private key
    pub secret_key_env: String,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    /// Reject verdicts scoring below this threshold (v3 only)
    pub min_score: Option<f64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

/// Google Maps Directions API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapsSection {
    /// Environment variable containing the API key
    pub api_key_env: String,
    #[serde(default = "default_directions_url")]
    pub directions_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_directions_url() -> String {
    "https://maps.googleapis.com/maps/api/directions/json".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl RecaptchaSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MapsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database.path must not be empty".to_string(),
            ));
        }
        validate_url("recaptcha.verify_url", &self.recaptcha.verify_url)?;
        validate_url("maps.directions_url", &self.maps.directions_url)?;

        if let Some(score) = self.recaptcha.min_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ConfigError::InvalidConfig(format!(
                    "recaptcha.min_score must be between 0.0 and 1.0, got {score}"
                )));
            }
        }

        Ok(())
    }

    /// Helper method to get environment variable with error propagation
    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Get the reCAPTCHA private key from its environment variable
    pub fn get_recaptcha_secret(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.recaptcha.secret_key_env)
    }

    /// Get the Google Maps API key from its environment variable
    pub fn get_maps_api_key(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.maps.api_key_env)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[recaptcha]
site_key = "test-site-key"
secret_key_env = "RECAPTCHA_PRIVATE_KEY"

[maps]
api_key_env = "GOOGLE_API_KEY"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidConfig(format!("{field} '{value}' is not a URL: {e}")))
}
