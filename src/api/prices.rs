use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use alloy::primitives::Address;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::sources::UpstreamPriceFeed;

pub type FeedState = Arc<dyn UpstreamPriceFeed>;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Accepts `{"tokenAddress": "0x…"}` or `{"tokenAddresses": ["0x…", …]}`.
fn requested_addresses(body: &[u8]) -> Option<Vec<String>> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let raw: Vec<&Value> = if let Some(list) = value.get("tokenAddresses") {
        list.as_array()?.iter().collect()
    } else {
        vec![value.get("tokenAddress")?]
    };

    raw.into_iter()
        .map(|v| {
            let s = v.as_str()?;
            s.parse::<Address>().ok().map(|_| s.to_string())
        })
        .collect()
}

/// POST /fetchTokenPrices
async fn fetch_token_prices(State(feed): State<FeedState>, body: Bytes) -> Response {
    let Some(addresses) = requested_addresses(&body) else {
        return error(StatusCode::BAD_REQUEST, "Invalid token addresses");
    };

    match feed.usd_prices(&addresses).await {
        Ok(prices) => {
            // Every requested address gets a key, even if the feed skipped it.
            let body: serde_json::Map<String, Value> = addresses
                .into_iter()
                .map(|a| {
                    let price = prices.get(&a).copied().unwrap_or(0.0);
                    (a, json!(price))
                })
                .collect();
            Json(Value::Object(body)).into_response()
        }
        Err(e) => {
            tracing::warn!("Upstream price lookup failed: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch token prices")
        }
    }
}

async fn method_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub fn create_price_router(feed: FeedState) -> Router {
    Router::new()
        .route(
            "/fetchTokenPrices",
            post(fetch_token_prices).fallback(method_not_allowed),
        )
        .with_state(feed)
}
