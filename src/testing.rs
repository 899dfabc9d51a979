//! In-memory collaborators shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use alloy::primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::PipelineConfig;

use crate::models::PoolInfo;
use crate::services::PoolAggregator;
use crate::sources::{ChainReader, PriceSource, SourceError};

pub fn addr(tag: u8) -> Address {
    Address::repeat_byte(tag)
}

pub fn lp_of(pid: u64) -> Address {
    addr(0x10 + pid as u8)
}

pub fn token0_of(pid: u64) -> Address {
    addr(0x40 + pid as u8)
}

pub fn token1_of(pid: u64) -> Address {
    addr(0x80 + pid as u8)
}

/// In-memory MasterChef with `pool_count` pools of weight `pid + 1`.
#[derive(Default)]
pub struct FakeChain {
    pub pool_count: u64,
    pub total_weight: u64,
    pub fail_pool_count: bool,
    /// `poolLength` never answers.
    pub hang_pool_count: bool,
    pub fail_pool_info: HashSet<u64>,
    pub fail_pair: HashSet<u64>,
    pub zero_pair: HashSet<u64>,
    pub fail_symbol: HashSet<u64>,
    pub pool_info_calls: Mutex<Vec<u64>>,
    pub symbols: HashMap<Address, String>,
}

impl FakeChain {
    pub fn new(pool_count: u64) -> Self {
        let mut symbols = HashMap::new();
        for pid in 0..pool_count {
            symbols.insert(token0_of(pid), format!("A{}", pid));
            symbols.insert(token1_of(pid), format!("B{}", pid));
        }
        Self {
            pool_count,
            total_weight: (1..=pool_count).sum(),
            symbols,
            ..Self::default()
        }
    }

    fn pid_of_token(&self, token: Address) -> u64 {
        (token[0] & 0x3f) as u64
    }
}

fn err() -> SourceError {
    SourceError::Network("connection refused".into())
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn pool_count(&self) -> Result<u64, SourceError> {
        if self.hang_pool_count {
            std::future::pending::<()>().await;
        }
        if self.fail_pool_count {
            return Err(err());
        }
        Ok(self.pool_count)
    }

    async fn pool_info(&self, pool_index: u64) -> Result<PoolInfo, SourceError> {
        self.pool_info_calls.lock().push(pool_index);
        if self.fail_pool_info.contains(&pool_index) {
            return Err(err());
        }
        Ok(PoolInfo {
            allocation_weight: U256::from(pool_index + 1),
            is_regular: pool_index % 2 == 0,
            ..PoolInfo::default()
        })
    }

    async fn lp_token_address(&self, pool_index: u64) -> Result<Address, SourceError> {
        Ok(lp_of(pool_index))
    }

    async fn pair_token_addresses(&self, lp_token: Address) -> Result<(Address, Address), SourceError> {
        let pid = (lp_token[0] - 0x10) as u64;
        if self.fail_pair.contains(&pid) {
            return Err(SourceError::Rpc { code: -32000, message: "execution reverted".into() });
        }
        if self.zero_pair.contains(&pid) {
            return Ok((Address::ZERO, token1_of(pid)));
        }
        Ok((token0_of(pid), token1_of(pid)))
    }

    async fn token_symbol(&self, token: Address) -> Result<String, SourceError> {
        if self.fail_symbol.contains(&self.pid_of_token(token)) {
            return Err(err());
        }
        self.symbols.get(&token).cloned().ok_or_else(err)
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, SourceError> {
        Ok(U256::from(100u64))
    }

    async fn token_total_supply(&self, _token: Address) -> Result<U256, SourceError> {
        Ok(U256::from(50u64))
    }

    async fn total_allocation_weight(&self) -> Result<U256, SourceError> {
        Ok(U256::from(self.total_weight))
    }

    async fn reward_rate_per_block(&self, is_regular: bool) -> Result<U256, SourceError> {
        Ok(U256::from(if is_regular { 1_000u64 } else { 300u64 }))
    }
}

pub struct FakePrices {
    pub unpriced: HashSet<Address>,
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn token_price(&self, token: Address) -> f64 {
        if self.unpriced.contains(&token) {
            0.0
        } else {
            2.0
        }
    }

    async fn token_prices(&self, tokens: &[Address]) -> Vec<f64> {
        let mut out = Vec::new();
        for t in tokens {
            out.push(self.token_price(*t).await);
        }
        out
    }
}

/// Aggregator over the fakes with the default retry policy.
pub fn aggregator(chain: Arc<FakeChain>, unpriced: HashSet<Address>, batch_size: usize) -> PoolAggregator {
    let config = PipelineConfig {
        batch_size,
        max_attempts: 3,
        retry_delay_ms: 1_000,
        global_timeout_ms: 60_000,
    };
    PoolAggregator::new(chain, Arc::new(FakePrices { unpriced }), &config)
}
