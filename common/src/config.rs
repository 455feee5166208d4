// Configuration management with layered configuration (file, env)

use crate::errors::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Environment variable prefix, e.g. `SFTP_EXPORTER__SFTP__HOST`
pub const ENV_PREFIX: &str = "SFTP_EXPORTER";

/// Overrides the directory holding `default.toml` / `local.toml`
pub const CONFIG_DIR_ENV: &str = "SFTP_EXPORTER_CONFIG_DIR";

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub sftp: SftpConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Remote endpoint and credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Base64 encoded private key
    pub key: String,
    pub key_file: String,
    pub key_passphrase: String,
    /// Remote paths to poll, in emission order
    pub paths: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
            user: String::new(),
            password: String::new(),
            key: String::new(),
            key_file: String::new(),
            key_passphrase: String::new(),
            paths: vec!["/".to_string()],
            timeout_seconds: 30,
        }
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("key", &redact(&self.key))
            .field("key_file", &self.key_file)
            .field("key_passphrase", &redact(&self.key_passphrase))
            .field("paths", &self.paths)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub tracing_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tracing_endpoint: None,
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from_path(config_dir)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        Self::load_with_env(config_dir, None)
    }

    /// Load configuration, reading environment overrides from `env` instead
    /// of the process environment when it is given
    pub fn load_with_env<P: AsRef<Path>>(
        config_dir: P,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Not committed to git
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sftp.paths")
                    .try_parsing(true)
                    .source(env),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "must be greater than 0"));
        }

        let sftp = &self.sftp;
        if sftp.host.trim().is_empty() {
            return Err(ConfigError::MissingField("sftp.host".to_string()));
        }
        if sftp.port == 0 {
            return Err(invalid("sftp.port", "must be greater than 0"));
        }
        if sftp.user.trim().is_empty() {
            return Err(ConfigError::MissingField("sftp.user".to_string()));
        }
        if sftp.paths.is_empty() {
            return Err(ConfigError::MissingField("sftp.paths".to_string()));
        }
        if sftp.paths.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("sftp.paths", "must not contain blank entries"));
        }
        let mut seen = HashSet::with_capacity(sftp.paths.len());
        if !sftp.paths.iter().all(|p| seen.insert(p.as_str())) {
            return Err(invalid("sftp.paths", "must not contain duplicates"));
        }
        if sftp.timeout_seconds == 0 {
            return Err(invalid("sftp.timeout_seconds", "must be greater than 0"));
        }
        if !sftp.key.trim().is_empty() && !sftp.key_file.trim().is_empty() {
            return Err(invalid(
                "sftp.key",
                "only one of sftp.key and sftp.key_file should be provided",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidFieldValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
