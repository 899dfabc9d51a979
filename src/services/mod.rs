pub mod collector;
pub mod dashboard;
pub mod presenter;
pub mod retry;
pub mod rewards;

pub use collector::{AggregationSession, PipelineError, PoolAggregator};
pub use presenter::{PoolQuery, SortKey, Tier};
pub use retry::RetryPolicy;
