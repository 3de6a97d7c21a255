//! Cross-dimensional staking ledger service
//!
//! Exposes modules for the binary and for integration tests

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod monitoring;
pub mod response;
pub mod routes;
pub mod staking;
pub mod staking_handlers;
pub mod tracing_logger;
pub mod tracing_middleware;
pub mod validation;

pub use routes::build_router;

use config::Config;
use staking::StakingEngine;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StakingEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(engine: StakingEngine, config: Config) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}
