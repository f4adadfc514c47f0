use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use yard_core::{AllocationPolicy, OCCUPIED_COLOR, Result, YardError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub occupancy: OccupancyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AllocationConfig {
    pub fn policy(&self) -> AllocationPolicy {
        AllocationPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyConfig {
    #[serde(default = "default_occupied_color")]
    pub occupied_color: String,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            occupied_color: default_occupied_color(),
        }
    }
}

fn default_occupied_color() -> String {
    OCCUPIED_COLOR.to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("YARD").separator("__"))
            .build()
            .map_err(|e| YardError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| YardError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.db_path.as_os_str().is_empty() {
            return Err(YardError::Config(
                "storage.db_path cannot be empty".to_string(),
            ));
        }

        if self.occupancy.occupied_color.trim().is_empty() {
            return Err(YardError::Config(
                "occupancy.occupied_color cannot be empty".to_string(),
            ));
        }

        if self.allocation.max_attempts == 0 {
            return Err(YardError::Config(
                "allocation.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
