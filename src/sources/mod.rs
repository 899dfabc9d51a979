pub mod chain;
pub mod coingecko;
pub mod contracts;
pub mod price;

use alloy::primitives::{Address, U256};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;

use crate::models::PoolInfo;

/// Read-only view of the MasterChef contract and the tokens it references.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn pool_count(&self) -> Result<u64, SourceError>;
    async fn pool_info(&self, pool_index: u64) -> Result<PoolInfo, SourceError>;
    async fn lp_token_address(&self, pool_index: u64) -> Result<Address, SourceError>;
    /// Not every LP token is a pair; callers treat failure as an unknown pair.
    async fn pair_token_addresses(&self, lp_token: Address) -> Result<(Address, Address), SourceError>;
    async fn token_symbol(&self, token: Address) -> Result<String, SourceError>;
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, SourceError>;
    async fn token_total_supply(&self, token: Address) -> Result<U256, SourceError>;
    async fn total_allocation_weight(&self) -> Result<U256, SourceError>;
    async fn reward_rate_per_block(&self, is_regular: bool) -> Result<U256, SourceError>;
}

/// USD price lookup. `0.0` means no price was available.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn token_price(&self, token: Address) -> f64;
    async fn token_prices(&self, tokens: &[Address]) -> Vec<f64>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
}

impl From<alloy::contract::Error> for SourceError {
    fn from(e: alloy::contract::Error) -> Self {
        match e {
            alloy::contract::Error::TransportError(err) => {
                if let Some(payload) = err.as_error_resp() {
                    return SourceError::Rpc {
                        code: payload.code,
                        message: payload.message.to_string(),
                    };
                }
                if let Some(TransportErrorKind::HttpError(http)) = err.as_transport_err() {
                    return SourceError::Status(http.status);
                }
                SourceError::Network(err.to_string())
            }
            // Empty or undecodable return data.
            other => SourceError::Decode(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// Upstream market-data feed behind the price endpoint. Returned prices are
/// keyed by the caller's spelling of each address; unknown tokens map to `0`.
#[async_trait]
pub trait UpstreamPriceFeed: Send + Sync {
    async fn usd_prices(
        &self,
        addresses: &[String],
    ) -> Result<std::collections::HashMap<String, f64>, SourceError>;
}
