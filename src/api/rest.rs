use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use crate::models::DashboardSnapshot;
use crate::services::PoolQuery;

pub struct AppState {
    pub snapshot: watch::Receiver<DashboardSnapshot>,
    pub refresh: Arc<Notify>,
}

impl AppState {
    /// Clones the current snapshot so no watch borrow outlives the call.
    pub fn current(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /status - loading progress, error message, record count
async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.current().status_json())
}

/// GET /pools - one page of records after sort/filter
async fn get_pools(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PoolQuery>,
) -> Json<serde_json::Value> {
    let snapshot = state.current();
    let page = query.apply(&snapshot.records);

    Json(serde_json::json!({
        "status": snapshot.status,
        "page": page.page,
        "total_pages": page.total_pages,
        "total_matches": page.total_matches,
        "pools": page.records,
    }))
}

/// POST /refresh - queue a new aggregation pass
async fn refresh(State(state): State<Arc<AppState>>) -> StatusCode {
    state.refresh.notify_one();
    StatusCode::ACCEPTED
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/pools", get(get_pools))
        .route("/refresh", post(refresh))
        .route("/ws", get(super::websocket::ws_handler))
        .with_state(state)
}
