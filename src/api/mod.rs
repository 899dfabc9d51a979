pub mod prices;
pub mod rest;
pub mod websocket;

pub use prices::create_price_router;
pub use rest::{create_rest_router, AppState};
pub use websocket::ws_handler;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::sources::UpstreamPriceFeed;

/// Dashboard routes plus the price endpoint, CORS open.
pub fn create_router(state: Arc<AppState>, feed: Arc<dyn UpstreamPriceFeed>) -> Router {
    create_rest_router(state)
        .merge(create_price_router(feed))
        .layer(CorsLayer::permissive())
}
