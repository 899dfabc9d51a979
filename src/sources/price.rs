use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use super::{PriceSource, SourceError};

/// Client for the `fetchTokenPrices` function.
pub struct PriceApiClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRequest {
    token_addresses: Vec<String>,
}

impl PriceApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/fetchTokenPrices", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    async fn request(&self, tokens: &[Address]) -> Result<Vec<f64>, SourceError> {
        let body = PriceRequest {
            token_addresses: tokens.iter().map(|t| t.to_string()).collect(),
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let prices: HashMap<String, serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let by_address: HashMap<String, f64> = prices
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_f64().unwrap_or(0.0)))
            .collect();

        Ok(tokens
            .iter()
            .map(|t| by_address.get(&t.to_string().to_lowercase()).copied().map(sanitize).unwrap_or(0.0))
            .collect())
    }
}

fn sanitize(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}

/// Races `lookup` against `timeout`. Errors and timeouts both resolve to a
/// zero for every requested token.
pub async fn prices_or_zero<F>(timeout: Duration, expected: usize, lookup: F) -> Vec<f64>
where
    F: Future<Output = Result<Vec<f64>, SourceError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(prices)) if prices.len() == expected => prices,
        Ok(Ok(prices)) => {
            tracing::warn!("price lookup returned {} prices for {} tokens", prices.len(), expected);
            vec![0.0; expected]
        }
        Ok(Err(e)) => {
            tracing::warn!("price lookup failed: {}", e);
            vec![0.0; expected]
        }
        Err(_) => {
            tracing::warn!("price lookup timed out after {}ms", timeout.as_millis());
            vec![0.0; expected]
        }
    }
}

#[async_trait]
impl PriceSource for PriceApiClient {
    async fn token_price(&self, token: Address) -> f64 {
        self.token_prices(&[token]).await.first().copied().unwrap_or(0.0)
    }

    async fn token_prices(&self, tokens: &[Address]) -> Vec<f64> {
        if tokens.is_empty() {
            return Vec::new();
        }
        prices_or_zero(self.timeout, tokens.len(), self.request(tokens)).await
    }
}
