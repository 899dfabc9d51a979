pub mod dashboard;
pub mod pool;

pub use dashboard::{DashboardSnapshot, DashboardStatus};
pub use pool::{GlobalParams, PoolInfo, PoolRecord, TotalValueLocked, Valuation};
