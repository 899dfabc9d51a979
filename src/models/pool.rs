use alloy::primitives::{Address, U256};
use serde::{Serialize, Serializer};

use crate::services::rewards;

/// Placeholder symbol when either pair token cannot be resolved.
pub const UNKNOWN_SYMBOL: &str = "NA";

/// Raw `poolInfo(pid)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolInfo {
    pub acc_reward_per_share: U256,
    pub last_reward_block: U256,
    pub allocation_weight: U256,
    pub total_boosted_share: U256,
    pub is_regular: bool,
}

/// Contract-wide inputs, read once per aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalParams {
    pub pool_count: u64,
    pub total_allocation_weight: U256,
    pub regular_reward_per_block: U256,
    pub special_reward_per_block: U256,
}

impl GlobalParams {
    pub fn reward_rate(&self, is_regular: bool) -> U256 {
        if is_regular {
            self.regular_reward_per_block
        } else {
            self.special_reward_per_block
        }
    }
}

/// Everything needed to value one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub reserves: (U256, U256),
    pub prices: (f64, f64),
    pub total_supplies: (U256, U256),
}

/// USD estimate of a pool's deposits. `Unavailable` is distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TotalValueLocked {
    Usd(f64),
    Unavailable,
}

impl TotalValueLocked {
    pub fn usd(&self) -> Option<f64> {
        match self {
            TotalValueLocked::Usd(v) => Some(*v),
            TotalValueLocked::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.usd().is_some()
    }
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// EIP-55 checksummed form.
fn serialize_address<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_checksum(None))
}

/// One staking pool as shown on the dashboard. Built once, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pool_index: u64,
    lp_token_symbol: String,
    #[serde(serialize_with = "serialize_decimal")]
    reward_per_block: U256,
    reward_percentage: f64,
    is_regular: bool,
    #[serde(serialize_with = "serialize_address")]
    lp_token_address: Address,
    total_value_locked: TotalValueLocked,
    #[serde(serialize_with = "serialize_decimal")]
    allocation_weight: U256,
}

impl PoolRecord {
    /// Derives reward figures from `info` and `params`, and TVL from
    /// `valuation` when the pair could be valued.
    pub fn new(
        pool_index: u64,
        info: &PoolInfo,
        lp_token_address: Address,
        lp_token_symbol: Option<String>,
        valuation: Option<Valuation>,
        params: &GlobalParams,
    ) -> Self {
        let reward_per_block = rewards::reward_per_block(
            params.reward_rate(info.is_regular),
            info.allocation_weight,
            params.total_allocation_weight,
        );
        let reward_percentage =
            rewards::reward_percentage(info.allocation_weight, params.total_allocation_weight);
        let total_value_locked = valuation
            .as_ref()
            .map(rewards::total_value_locked)
            .unwrap_or(TotalValueLocked::Unavailable);

        Self {
            pool_index,
            lp_token_symbol: lp_token_symbol.unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
            reward_per_block,
            reward_percentage,
            is_regular: info.is_regular,
            lp_token_address,
            total_value_locked,
            allocation_weight: info.allocation_weight,
        }
    }

    pub fn pool_index(&self) -> u64 { self.pool_index }
    pub fn lp_token_symbol(&self) -> &str { &self.lp_token_symbol }
    pub fn reward_per_block(&self) -> U256 { self.reward_per_block }
    pub fn reward_percentage(&self) -> f64 { self.reward_percentage }
    pub fn is_regular(&self) -> bool { self.is_regular }
    pub fn lp_token_address(&self) -> Address { self.lp_token_address }
    pub fn total_value_locked(&self) -> TotalValueLocked { self.total_value_locked }
    pub fn allocation_weight(&self) -> U256 { self.allocation_weight }

    pub fn is_active(&self) -> bool {
        !self.allocation_weight.is_zero()
    }
}
