use crate::session::{SshAuth, SshTarget};
use crate::{Error, Result};
use rigctl_types::{DEFAULT_HOME_ANGLE, DEFAULT_STEP_DEGREES, MAX_ANGLE, MIN_ANGLE};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DRIVER_PATH: &str = "/usr/local/bin/mtdr";
pub const DEFAULT_REGISTRY_PATH: &str = "/etc/NiBot/RSXA.json";
pub const DEFAULT_PASSWORD_ENV: &str = "RIGCTL_PASSWORD";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub motion: MotionConfig,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let home = self.motion.home_angle;
        if !home.is_finite() || !(MIN_ANGLE..=MAX_ANGLE).contains(&home) {
            return Err(Error::Config(format!(
                "motion.homeAngle must be within [{MIN_ANGLE}, {MAX_ANGLE}], got {home}"
            )));
        }

        let step = self.motion.step_degrees;
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::Config(format!(
                "motion.stepDegrees must be positive, got {step}"
            )));
        }

        if self.connection.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "connection.connectTimeoutSecs must be at least 1".to_string(),
            ));
        }
        if self.connection.command_timeout_secs == 0 {
            return Err(Error::Config(
                "connection.commandTimeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.driver.path.trim().is_empty() {
            return Err(Error::Config("driver.path is empty".to_string()));
        }
        if self.driver.registry_path.trim().is_empty() {
            return Err(Error::Config("driver.registryPath is empty".to_string()));
        }

        if self.connection.auth.method == AuthMethod::KeyFile && self.connection.auth.key_path.is_none()
        {
            return Err(Error::Config(
                "connection.auth.keyPath is required for keyFile auth".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the SSH target, reading any secret from the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no host is configured or password auth is
    /// selected and the password variable is unset.
    pub fn ssh_target(&self) -> Result<SshTarget> {
        let connection = &self.connection;
        let host = connection
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::Config("connection.host is not set".to_string()))?;

        let auth = connection.auth.resolve()?;

        Ok(SshTarget::new(host, connection.username.clone(), auth)
            .with_port(connection.port)
            .with_connect_timeout(connection.connect_timeout()))
    }
}

/// Remote host and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound for every command or file transfer
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl ConnectionConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_port() -> u16 {
    22
}
fn default_username() -> String {
    "pi".to_string()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_command_timeout() -> u64 {
    15
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            username: default_username(),
            auth: AuthConfig::default(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    #[default]
    Agent,
    Password,
    KeyFile,
}

/// Authentication settings. Secrets live in the environment, never in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub method: AuthMethod,

    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Environment variable holding the password or key passphrase
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::default(),
            key_path: None,
            password_env: default_password_env(),
        }
    }
}

impl AuthConfig {
    fn secret_from_env(&self) -> Option<SecretString> {
        std::env::var(&self.password_env)
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    }

    fn resolve(&self) -> Result<SshAuth> {
        match self.method {
            AuthMethod::Agent => Ok(SshAuth::Agent),
            AuthMethod::Password => self
                .secret_from_env()
                .map(SshAuth::Password)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "password auth selected but ${} is not set",
                        self.password_env
                    ))
                }),
            AuthMethod::KeyFile => {
                let key_path = self.key_path.clone().ok_or_else(|| {
                    Error::Config("connection.auth.keyPath is not set".to_string())
                })?;
                Ok(SshAuth::KeyFile {
                    key_path,
                    passphrase: self.secret_from_env(),
                })
            }
        }
    }
}

/// Remote driver binary and registry document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    #[serde(default = "default_driver_path")]
    pub path: String,

    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

fn default_driver_path() -> String {
    DEFAULT_DRIVER_PATH.to_string()
}
fn default_registry_path() -> String {
    DEFAULT_REGISTRY_PATH.to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            path: default_driver_path(),
            registry_path: default_registry_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionConfig {
    #[serde(default = "default_home_angle")]
    pub home_angle: f64,

    /// Step for Up/Down/Left/Right when none is given
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,
}

fn default_home_angle() -> f64 {
    DEFAULT_HOME_ANGLE
}
fn default_step_degrees() -> f64 {
    DEFAULT_STEP_DEGREES
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            home_angle: default_home_angle(),
            step_degrees: default_step_degrees(),
        }
    }
}
