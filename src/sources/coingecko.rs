use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{SourceError, UpstreamPriceFeed};

/// CoinGecko `simple/token_price` lookup for one asset platform.
pub struct CoinGecko {
    client: Client,
    base_url: String,
    platform: String,
}

#[derive(Debug, Deserialize)]
struct GeckoQuote {
    usd: Option<f64>,
}

impl CoinGecko {
    pub fn new(base_url: &str, platform: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| SourceError::Network(e.to_string()))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            platform: platform.to_string(),
        })
    }
}

/// Maps CoinGecko's lowercase-keyed quotes back onto the requested spellings.
fn collect_prices(addresses: &[String], data: &HashMap<String, GeckoQuote>) -> HashMap<String, f64> {
    addresses
        .iter()
        .map(|address| {
            let price = data
                .get(&address.to_lowercase())
                .and_then(|q| q.usd)
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0);
            (address.clone(), price)
        })
        .collect()
}

#[async_trait]
impl UpstreamPriceFeed for CoinGecko {
    async fn usd_prices(&self, addresses: &[String]) -> Result<HashMap<String, f64>, SourceError> {
        if addresses.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/simple/token_price/{}?vs_currencies=usd&contract_addresses={}",
            self.base_url,
            self.platform,
            addresses.join(",")
        );

        let resp = self.client.get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let data: HashMap<String, GeckoQuote> = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        tracing::debug!("CoinGecko quoted {}/{} tokens", data.len(), addresses.len());
        Ok(collect_prices(addresses, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_addresses_default_to_zero() {
        let data: HashMap<String, GeckoQuote> = serde_json::from_str(
            r#"{"0xabc": {"usd": 2.5}, "0xdef": {}}"#,
        )
        .unwrap();
        let prices = collect_prices(
            &["0xABC".to_string(), "0xdef".to_string(), "0x123".to_string()],
            &data,
        );
        assert_eq!(prices["0xABC"], 2.5);
        assert_eq!(prices["0xdef"], 0.0);
        assert_eq!(prices["0x123"], 0.0);
    }
}
