use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;

use super::contracts::{IERC20Bytes32, IMasterChefV2, IPancakePair, IERC20};
use super::{ChainReader, SourceError};
use crate::models::PoolInfo;

/// `eth_call` reader bound to one MasterChef deployment.
pub struct RpcChainReader {
    provider: DynProvider,
    masterchef: Address,
    timeout: Duration,
}

impl RpcChainReader {
    pub fn new(rpc_url: &str, masterchef: Address, timeout: Duration) -> Result<Self, SourceError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| SourceError::Network(format!("invalid RPC url {}: {}", rpc_url, e)))?;
        // Read-only: no nonce/gas/chain-id fillers.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            masterchef,
            timeout,
        })
    }

    /// Awaits one contract call, giving up after the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, SourceError>
    where
        F: IntoFuture<Output = Result<T, alloy::contract::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(SourceError::from),
            Err(_) => Err(SourceError::Timeout),
        }
    }
}

/// NUL-padded `bytes32` text.
fn bytes32_to_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn pool_count(&self) -> Result<u64, SourceError> {
        let chef = IMasterChefV2::new(self.masterchef, &self.provider);
        let count = self.bounded(chef.poolLength().call()).await?;
        u64::try_from(count).map_err(|_| SourceError::Decode("poolLength exceeds u64".into()))
    }

    async fn pool_info(&self, pool_index: u64) -> Result<PoolInfo, SourceError> {
        let chef = IMasterChefV2::new(self.masterchef, &self.provider);
        let info = self.bounded(chef.poolInfo(U256::from(pool_index)).call()).await?;

        Ok(PoolInfo {
            acc_reward_per_share: info.accCakePerShare,
            last_reward_block: info.lastRewardBlock,
            allocation_weight: info.allocPoint,
            total_boosted_share: info.totalBoostedShare,
            is_regular: info.isRegular,
        })
    }

    async fn lp_token_address(&self, pool_index: u64) -> Result<Address, SourceError> {
        let chef = IMasterChefV2::new(self.masterchef, &self.provider);
        self.bounded(chef.lpToken(U256::from(pool_index)).call()).await
    }

    async fn pair_token_addresses(&self, lp_token: Address) -> Result<(Address, Address), SourceError> {
        let pair = IPancakePair::new(lp_token, &self.provider);
        let token0 = pair.token0();
        let token1 = pair.token1();
        tokio::try_join!(
            self.bounded(token0.call()),
            self.bounded(token1.call()),
        )
    }

    async fn token_symbol(&self, token: Address) -> Result<String, SourceError> {
        let erc20 = IERC20::new(token, &self.provider);
        match self.bounded(erc20.symbol().call()).await {
            Err(SourceError::Decode(reason)) => {
                tracing::debug!("{} symbol() is not a string ({}), trying bytes32", token, reason);
                let legacy = IERC20Bytes32::new(token, &self.provider);
                let raw = self.bounded(legacy.symbol().call()).await?;
                Ok(bytes32_to_string(raw.as_slice()))
            }
            other => other,
        }
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, SourceError> {
        let erc20 = IERC20::new(token, &self.provider);
        self.bounded(erc20.balanceOf(owner).call()).await
    }

    async fn token_total_supply(&self, token: Address) -> Result<U256, SourceError> {
        let erc20 = IERC20::new(token, &self.provider);
        self.bounded(erc20.totalSupply().call()).await
    }

    async fn total_allocation_weight(&self) -> Result<U256, SourceError> {
        let chef = IMasterChefV2::new(self.masterchef, &self.provider);
        self.bounded(chef.totalSpecialAllocPoint().call()).await
    }

    async fn reward_rate_per_block(&self, is_regular: bool) -> Result<U256, SourceError> {
        let chef = IMasterChefV2::new(self.masterchef, &self.provider);
        self.bounded(chef.cakePerBlock(is_regular).call()).await
    }
}
