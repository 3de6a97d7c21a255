//! Cross-dimensional asset staking ledger

pub mod clock;
pub mod engine;
pub mod error;
pub mod pools;
pub mod store;
pub mod types;
pub mod valuation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ClosedPosition, EngineSettings, RewardQuote, StakingEngine};
pub use error::StakingError;
pub use pools::{default_pool_configs, PoolRegistry};
pub use store::{InMemoryPositionStore, PositionStore};
pub use types::{
    categories, Asset, Dimension, PoolConfig, PoolStatistics, PoolType, PositionMultipliers,
    StakingPool, StakingPosition,
};
