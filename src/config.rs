/*!
 * Configuration types for Forge
 */

use forge_core_interface::StoreMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ForgeError, Result};

/// Default backend address when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// RPC endpoint handed to locally provisioned star systems; `{subnet_id}` is substituted
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:41773/ext/bc/{subnet_id}/rpc";

pub const ENV_MODE: &str = "FORGE_MODE";
pub const ENV_API_URL: &str = "FORGE_API_URL";
pub const ENV_DATA_DIR: &str = "FORGE_DATA_DIR";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Which backend to use; fixed for the lifetime of a `Forge`
    #[serde(default)]
    pub mode: StoreMode,

    /// Directory holding the local store's collections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Interval for `forge watch` and background refresh
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON logs here instead of stdout
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
}

/// Bounded waits applied by the facade to every store call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_read_timeout")]
    pub read_secs: u64,

    #[serde(default = "default_write_timeout")]
    pub write_secs: u64,
}

/// Logging level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::default(),
            data_dir: default_data_dir(),
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            timeouts: TimeoutConfig::default(),
            refresh_interval_secs: default_refresh_interval(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: default_read_timeout(),
            write_secs: default_write_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("forge"))
        .unwrap_or_else(|| PathBuf::from(".forge"))
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_rpc_url() -> String {
    DEFAULT_LOCAL_RPC_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    5
}

fn default_write_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    5
}

impl ForgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ForgeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| ForgeError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ForgeError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| {
            ForgeError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Explicit file if given, otherwise `<config dir>/forge/config.toml` when it
    /// exists, otherwise defaults. Environment overrides apply last.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FORGE_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE).filter(|v| !v.trim().is_empty()) {
            self.mode = mode
                .parse()
                .map_err(|e| ForgeError::Config(format!("{ENV_MODE}: {e}")))?;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.remote.base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeouts.read_secs == 0 || self.timeouts.write_secs == 0 {
            return Err(ForgeError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ForgeError::Config(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.mode == StoreMode::Remote {
            let url = self.remote.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ForgeError::Config(format!(
                    "remote.base_url must be an http(s) URL, got '{}'",
                    self.remote.base_url
                )));
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("forge").join("config.toml"))
}
