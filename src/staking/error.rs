//! Ledger error kinds

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::PoolType;

#[derive(Debug, Error)]
pub enum StakingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Stake value {provided:.2} is below the {pool} minimum of {required:.2}")]
    InsufficientStake {
        pool: PoolType,
        required: f64,
        provided: f64,
    },

    #[error("Lock period of {requested} days is not offered by {pool} (allowed: {allowed:?})")]
    InvalidLockPeriod {
        pool: PoolType,
        requested: u32,
        allowed: Vec<u32>,
    },

    #[error("Position {0} not found")]
    PositionNotFound(String),

    #[error("Asset {asset_id} not found in position {position_id}")]
    AssetNotFound {
        position_id: String,
        asset_id: String,
    },

    #[error("Position {position_id} is locked for {remaining_days} more days")]
    LockPeriodActive {
        position_id: String,
        remaining_days: i64,
        unlock_time: DateTime<Utc>,
    },

    #[error("Position {0} is already closed")]
    PositionClosed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl StakingError {
    pub fn validation(message: impl Into<String>) -> Self {
        StakingError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StakingError>;
