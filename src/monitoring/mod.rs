//! Ledger monitoring

pub mod staking_monitor;

pub use staking_monitor::StakingMonitor;
