//! Reward distribution and valuation arithmetic.

use alloy::primitives::{U256, U512};

use crate::models::{TotalValueLocked, Valuation};

fn widen(value: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(value.as_limbs());
    U512::from_limbs(limbs)
}

/// `floor(rate * weight / total)` without intermediate overflow. Zero when
/// no allocation exists.
pub fn reward_per_block(rate: U256, weight: U256, total: U256) -> U256 {
    if total.is_zero() {
        return U256::ZERO;
    }
    let wide = widen(rate) * widen(weight) / widen(total);
    let limbs = wide.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return U256::MAX;
    }
    U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]])
}

/// Share of the total allocation in percent, clamped to `[0, 100]`.
pub fn reward_percentage(weight: U256, total: U256) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    let pct = u256_to_f64(weight) / u256_to_f64(total) * 100.0;
    if pct.is_finite() {
        pct.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Lossy conversion; exact up to 2^53.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

fn usable_price(price: f64) -> Option<f64> {
    (price.is_finite() && price > 0.0).then_some(price)
}

/// `(reserve0*price0 + reserve1*price1) / (supply0 + supply1)`.
///
/// A zero price means the lookup failed, so it yields `Unavailable` rather
/// than a misleading figure. So does an empty supply.
pub fn total_value_locked(valuation: &Valuation) -> TotalValueLocked {
    let (Some(price0), Some(price1)) = (usable_price(valuation.prices.0), usable_price(valuation.prices.1)) else {
        return TotalValueLocked::Unavailable;
    };

    let supply = u256_to_f64(valuation.total_supplies.0) + u256_to_f64(valuation.total_supplies.1);
    if supply <= 0.0 {
        return TotalValueLocked::Unavailable;
    }

    let value = (u256_to_f64(valuation.reserves.0) * price0
        + u256_to_f64(valuation.reserves.1) * price1)
        / supply;

    if value.is_finite() && value >= 0.0 {
        TotalValueLocked::Usd(value)
    } else {
        TotalValueLocked::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn reward_per_block_truncates() {
        assert_eq!(reward_per_block(u(10), u(1), u(3)), u(3));
        assert_eq!(reward_per_block(u(100), u(2), u(3)), u(66));
        assert_eq!(reward_per_block(u(0), u(2), u(3)), u(0));
    }

    #[test]
    fn reward_per_block_guards_zero_total() {
        assert_eq!(reward_per_block(u(1_000), u(5), u(0)), U256::ZERO);
    }

    #[test]
    fn reward_per_block_survives_wide_products() {
        let rate = U256::MAX / u(2);
        assert_eq!(reward_per_block(rate, u(4), u(4)), rate);
        assert_eq!(reward_per_block(U256::MAX, u(2), u(1)), U256::MAX);
    }

    #[test]
    fn percentage_is_bounded_and_guarded() {
        assert_eq!(reward_percentage(u(1), u(4)), 25.0);
        assert_eq!(reward_percentage(u(0), u(4)), 0.0);
        assert_eq!(reward_percentage(u(7), u(0)), 0.0);
        assert_eq!(reward_percentage(u(9), u(4)), 100.0);
        assert!(!reward_percentage(u(0), u(0)).is_nan());
    }

    #[test]
    fn converts_large_values() {
        assert_eq!(u256_to_f64(u(12_345)), 12_345.0);
        let one_eth = U256::from(10u64).pow(u(18));
        assert_eq!(u256_to_f64(one_eth), 1e18);
        assert!(u256_to_f64(U256::MAX) > 1e77);
    }

    fn valuation(prices: (f64, f64)) -> Valuation {
        Valuation {
            reserves: (u(100), u(50)),
            prices,
            total_supplies: (u(10), u(15)),
        }
    }

    #[test]
    fn tvl_uses_both_prices() {
        assert_eq!(
            total_value_locked(&valuation((2.0, 4.0))),
            TotalValueLocked::Usd((100.0 * 2.0 + 50.0 * 4.0) / 25.0)
        );
    }

    #[test]
    fn tvl_is_unavailable_when_a_price_is_zero() {
        assert_eq!(total_value_locked(&valuation((0.0, 4.0))), TotalValueLocked::Unavailable);
        assert_eq!(total_value_locked(&valuation((2.0, 0.0))), TotalValueLocked::Unavailable);
        assert_eq!(total_value_locked(&valuation((f64::NAN, 1.0))), TotalValueLocked::Unavailable);
    }

    #[test]
    fn tvl_is_unavailable_without_supply() {
        let mut v = valuation((1.0, 1.0));
        v.total_supplies = (u(0), u(0));
        assert_eq!(total_value_locked(&v), TotalValueLocked::Unavailable);
    }
}
