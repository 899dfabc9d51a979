//! Sorting, filtering, paging and display formatting for pool rows.

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use num_format::{Locale, ToFormattedString};
use serde::Deserialize;
use std::cmp::Ordering;
use tabled::{settings::Style, Table, Tabled};

use crate::models::{PoolRecord, TotalValueLocked};

/// Unit of the reward token (18 decimals).
pub const REWARD_UNIT: &str = "ether";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Index,
    Symbol,
    Reward,
    Percentage,
    Tvl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    All,
    Regular,
    Special,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolQuery {
    pub sort: SortKey,
    pub desc: bool,
    pub filter: Option<String>,
    pub tier: Tier,
    pub active_only: bool,
    pub page: usize,
    pub page_size: usize,
}

impl Default for PoolQuery {
    fn default() -> Self {
        Self {
            sort: SortKey::Index,
            desc: false,
            filter: None,
            tier: Tier::All,
            active_only: false,
            page: 1,
            page_size: 10,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
    pub records: Vec<&'a PoolRecord>,
}

fn tvl_order(a: TotalValueLocked, b: TotalValueLocked) -> Ordering {
    match (a.usd(), b.usd()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &PoolRecord, b: &PoolRecord, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Index => Ordering::Equal,
        SortKey::Symbol => a
            .lp_token_symbol()
            .to_lowercase()
            .cmp(&b.lp_token_symbol().to_lowercase()),
        SortKey::Reward => a.reward_per_block().cmp(&b.reward_per_block()),
        SortKey::Percentage => a.reward_percentage().total_cmp(&b.reward_percentage()),
        SortKey::Tvl => tvl_order(a.total_value_locked(), b.total_value_locked()),
    };
    primary.then_with(|| a.pool_index().cmp(&b.pool_index()))
}

impl PoolQuery {
    fn matches(&self, record: &PoolRecord) -> bool {
        let tier_ok = match self.tier {
            Tier::All => true,
            Tier::Regular => record.is_regular(),
            Tier::Special => !record.is_regular(),
        };
        let active_ok = !self.active_only || record.is_active();
        let text_ok = match self.filter.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                record.lp_token_symbol().to_lowercase().contains(&needle)
                    || record.lp_token_address().to_string().to_lowercase().contains(&needle)
            }
        };
        tier_ok && active_ok && text_ok
    }

    /// Filters, sorts and slices `records`. Pages are 1-based; a page past
    /// the end is empty.
    pub fn apply<'a>(&self, records: &'a [PoolRecord]) -> Page<'a> {
        let mut matched: Vec<&PoolRecord> = records.iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| {
            let ord = compare(a, b, self.sort);
            if self.desc { ord.reverse() } else { ord }
        });

        let page_size = self.page_size.max(1);
        let page = self.page.max(1);
        let total_matches = matched.len();
        let total_pages = total_matches.div_ceil(page_size);

        let records = matched
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Page {
            page,
            total_pages,
            total_matches,
            records,
        }
    }
}

/// Reward amount in whole tokens, trailing zeros trimmed (`1.5`, `0`, `2`).
pub fn format_reward(value: U256) -> String {
    let text = format_units(value, REWARD_UNIT).unwrap_or_else(|_| value.to_string());
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// `$1,234.56`, or `N/A` when no estimate exists or it cannot be shown
/// to the cent.
pub fn format_usd(tvl: TotalValueLocked) -> String {
    match tvl.usd() {
        Some(value) if value.is_finite() && value >= 0.0 => {
            let cents = (value * 100.0).round();
            if cents >= u128::MAX as f64 {
                return "N/A".to_string();
            }
            let cents = cents as u128;
            format!("${}.{:02}", (cents / 100).to_formatted_string(&Locale::en), cents % 100)
        }
        _ => "N/A".to_string(),
    }
}

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "LP Token")]
    symbol: String,
    #[tabled(rename = "Reward/Block (CAKE)")]
    reward: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Type")]
    tier: String,
    #[tabled(rename = "TVL")]
    tvl: String,
    #[tabled(rename = "LP Token Address")]
    address: String,
}

impl From<&PoolRecord> for PoolRow {
    fn from(record: &PoolRecord) -> Self {
        Self {
            pool: format!("#{}", record.pool_index()),
            symbol: record.lp_token_symbol().to_string(),
            reward: format_reward(record.reward_per_block()),
            share: format!("{:.2}%", record.reward_percentage()),
            tier: if record.is_regular() { "Regular" } else { "Special" }.to_string(),
            tvl: format_usd(record.total_value_locked()),
            address: record.lp_token_address().to_string(),
        }
    }
}

/// Renders a page as a terminal table with a position footer.
pub fn render_page(page: &Page<'_>) -> String {
    if page.records.is_empty() {
        return format!("No pools on page {} ({} matching pools)", page.page, page.total_matches);
    }
    let rows: Vec<PoolRow> = page.records.iter().map(|r| PoolRow::from(*r)).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!(
        "{}\npage {} of {} ({} pools)",
        table,
        page.page,
        page.total_pages,
        page.total_matches
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GlobalParams, PoolInfo, Valuation};
    use alloy::primitives::Address;

    fn record(pid: u64, symbol: &str, weight: u64, is_regular: bool, price: f64) -> PoolRecord {
        let params = GlobalParams {
            pool_count: 4,
            total_allocation_weight: U256::from(10u64),
            regular_reward_per_block: U256::from(1_000_000_000_000_000_000u64),
            special_reward_per_block: U256::from(100_000_000_000_000_000u64),
        };
        let info = PoolInfo {
            allocation_weight: U256::from(weight),
            is_regular,
            ..PoolInfo::default()
        };
        let valuation = Valuation {
            reserves: (U256::from(10u64), U256::from(10u64)),
            prices: (price, price),
            total_supplies: (U256::from(10u64), U256::from(10u64)),
        };
        PoolRecord::new(pid, &info, Address::repeat_byte(pid as u8), Some(symbol.into()), Some(valuation), &params)
    }

    fn sample() -> Vec<PoolRecord> {
        vec![
            record(0, "CAKE-WBNB", 4, true, 3.0),
            record(1, "BUSD-USDT", 0, true, 1.0),
            record(2, "ETH-WBNB", 5, false, 0.0),
            record(3, "cake-busd", 1, true, 5.0),
        ]
    }

    fn indices(page: &Page<'_>) -> Vec<u64> {
        page.records.iter().map(|r| r.pool_index()).collect()
    }

    #[test]
    fn default_query_keeps_index_order() {
        let records = sample();
        let page = PoolQuery::default().apply(&records);
        assert_eq!(indices(&page), vec![0, 1, 2, 3]);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn filters_by_symbol_tier_and_activity() {
        let records = sample();
        let query = PoolQuery { filter: Some("Cake".into()), ..PoolQuery::default() };
        assert_eq!(indices(&query.apply(&records)), vec![0, 3]);

        let query = PoolQuery { tier: Tier::Special, ..PoolQuery::default() };
        assert_eq!(indices(&query.apply(&records)), vec![2]);

        let query = PoolQuery { active_only: true, ..PoolQuery::default() };
        assert_eq!(indices(&query.apply(&records)), vec![0, 2, 3]);
    }

    #[test]
    fn tvl_sort_places_unavailable_lowest() {
        let records = sample();
        let query = PoolQuery { sort: SortKey::Tvl, desc: true, ..PoolQuery::default() };
        assert_eq!(indices(&query.apply(&records)), vec![3, 0, 1, 2]);
    }

    #[test]
    fn sorts_by_symbol_case_insensitively() {
        let records = sample();
        let query = PoolQuery { sort: SortKey::Symbol, ..PoolQuery::default() };
        assert_eq!(indices(&query.apply(&records)), vec![1, 3, 0, 2]);
    }

    #[test]
    fn paginates_with_one_based_pages() {
        let records = sample();
        let query = PoolQuery { page: 2, page_size: 3, ..PoolQuery::default() };
        let page = query.apply(&records);
        assert_eq!(indices(&page), vec![3]);
        assert_eq!(page.total_pages, 2);

        let beyond = PoolQuery { page: 5, page_size: 3, ..PoolQuery::default() }.apply(&records);
        assert!(beyond.records.is_empty());
        assert_eq!(beyond.total_matches, 4);
    }

    #[test]
    fn formats_reward_units() {
        assert_eq!(format_reward(U256::from(1_000_000_000_000_000_000u64)), "1");
        assert_eq!(format_reward(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_reward(U256::from(40_000_000_000_000_000_000u128)), "40");
        assert_eq!(format_reward(U256::ZERO), "0");
        assert_eq!(format_reward(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn formats_usd_and_unavailable() {
        assert_eq!(format_usd(TotalValueLocked::Usd(1_234_567.891)), "$1,234,567.89");
        assert_eq!(format_usd(TotalValueLocked::Usd(0.0)), "$0.00");
        assert_eq!(format_usd(TotalValueLocked::Unavailable), "N/A");
        assert_eq!(format_usd(TotalValueLocked::Usd(2.5e17)), "$250,000,000,000,000,000.00");
        assert_eq!(format_usd(TotalValueLocked::Usd(1e300)), "N/A");
    }

    #[test]
    fn renders_rows_and_footer() {
        let records = sample();
        let page = PoolQuery { page_size: 2, ..PoolQuery::default() }.apply(&records);
        let text = render_page(&page);
        assert!(text.contains("CAKE-WBNB"));
        assert!(text.contains("Regular"));
        assert!(text.contains("page 1 of 2 (4 pools)"));
        assert!(!text.contains("ETH-WBNB"));
    }
}
