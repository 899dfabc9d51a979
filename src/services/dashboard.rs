use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::PoolAggregator;
use crate::models::DashboardSnapshot;

/// Shown when a run cannot even read the contract's global parameters.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch pools. Please try again.";

/// Runs one aggregation pass, publishing a snapshot after every batch. The
/// previous record list is replaced as soon as the run starts.
pub async fn refresh_once(aggregator: &PoolAggregator, tx: &watch::Sender<DashboardSnapshot>) {
    tx.send_replace(DashboardSnapshot::loading(0.0, Arc::new(Vec::new())));

    let result = aggregator
        .run(|session| {
            tx.send_replace(DashboardSnapshot::loading(
                session.progress(),
                Arc::new(session.records().to_vec()),
            ));
        })
        .await;

    match result {
        Ok(session) => {
            tx.send_replace(DashboardSnapshot::ready(Arc::new(session.into_records())));
        }
        Err(e) => {
            tracing::error!("Aggregation failed: {}", e);
            let records = tx.borrow().records.clone();
            tx.send_replace(DashboardSnapshot::failed(FETCH_FAILED_MESSAGE.to_string(), records));
        }
    }
}

/// Background loop: one pass at startup, then one per refresh request.
/// Requests made during a pass queue a single follow-up pass.
pub async fn drive(aggregator: Arc<PoolAggregator>, tx: watch::Sender<DashboardSnapshot>, refresh: Arc<Notify>) {
    loop {
        refresh_once(&aggregator, &tx).await;
        refresh.notified().await;
        tracing::info!("Refresh requested");
    }
}
