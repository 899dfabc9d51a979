use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_masterchef_address")]
    pub masterchef_address: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceConfig {
    /// Base URL of the price lookup function (`{base_url}/fetchTokenPrices`)
    #[serde(default = "default_price_base_url")]
    pub base_url: String,
    #[serde(default = "default_price_timeout_ms")]
    pub timeout_ms: u64,
    /// Upstream used when this process serves the price endpoint itself
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_platform")]
    pub platform: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on reading the contract-wide parameters, retries included
    #[serde(default = "default_global_timeout_ms")]
    pub global_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_rpc_url() -> String { "https://bsc-dataseed.binance.org".to_string() }
fn default_masterchef_address() -> String { "0xa5f8C5Dbd5F286960b9d90548680aE5ff69FF024".to_string() }
fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_price_base_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_price_timeout_ms() -> u64 { 5_000 }
fn default_upstream_url() -> String { "https://api.coingecko.com/api/v3".to_string() }
fn default_platform() -> String { "binance-smart-chain".to_string() }
fn default_batch_size() -> usize { 10 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1_000 }
fn default_global_timeout_ms() -> u64 { 60_000 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            masterchef_address: default_masterchef_address(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: default_price_base_url(),
            timeout_ms: default_price_timeout_ms(),
            upstream_url: default_upstream_url(),
            platform: default_platform(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            global_timeout_ms: default_global_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ChainConfig {
    pub fn masterchef(&self) -> Result<Address, ConfigError> {
        self.masterchef_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("malformed masterchef_address {}", self.masterchef_address))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PipelineConfig {
    pub fn global_timeout(&self) -> Duration {
        Duration::from_millis(self.global_timeout_ms)
    }
}

impl PriceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    /// `RPC_URL` and `PRICE_API_BASE` override the two endpoints.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using defaults", path.display());
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            config.chain.rpc_url = rpc_url;
        }
        if let Ok(base) = std::env::var("PRICE_API_BASE") {
            config.price.base_url = base;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::Invalid("pipeline.batch_size must be at least 1".into()));
        }
        self.chain.masterchef()?;
        Ok(())
    }
}
