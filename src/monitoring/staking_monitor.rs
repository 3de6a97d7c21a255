//! Prometheus metrics for the staking ledger
//! Each monitor owns its registry so several engines can coexist in one process

use prometheus::{
    CounterVec, Encoder, GaugeVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::staking::types::{PoolStatistics, PoolType};

pub struct StakingMonitor {
    registry: Registry,
    positions_opened: IntCounterVec,
    positions_closed: IntCounterVec,
    rewards_paid: CounterVec,
    pool_total_staked: GaugeVec,
    pool_participants: IntGaugeVec,
}

/// How a position left the ledger
#[derive(Debug, Clone, Copy)]
pub enum CloseKind {
    Normal,
    Emergency,
}

impl CloseKind {
    fn as_str(&self) -> &'static str {
        match self {
            CloseKind::Normal => "normal",
            CloseKind::Emergency => "emergency",
        }
    }
}

impl StakingMonitor {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let positions_opened = IntCounterVec::new(
            Opts::new("staking_positions_opened_total", "Positions opened"),
            &["pool"],
        )?;
        let positions_closed = IntCounterVec::new(
            Opts::new("staking_positions_closed_total", "Positions closed"),
            &["pool", "kind"],
        )?;
        let rewards_paid = CounterVec::new(
            Opts::new("staking_rewards_paid_total", "Rewards paid out through claims and closes"),
            &["pool"],
        )?;
        let pool_total_staked = GaugeVec::new(
            Opts::new("staking_pool_total_staked", "Composite value currently staked per pool"),
            &["pool"],
        )?;
        let pool_participants = IntGaugeVec::new(
            Opts::new("staking_pool_participants", "Open positions per pool"),
            &["pool"],
        )?;

        registry.register(Box::new(positions_opened.clone()))?;
        registry.register(Box::new(positions_closed.clone()))?;
        registry.register(Box::new(rewards_paid.clone()))?;
        registry.register(Box::new(pool_total_staked.clone()))?;
        registry.register(Box::new(pool_participants.clone()))?;

        Ok(Self {
            registry,
            positions_opened,
            positions_closed,
            rewards_paid,
            pool_total_staked,
            pool_participants,
        })
    }

    pub fn record_open(&self, pool: PoolType) {
        self.positions_opened.with_label_values(&[pool.as_str()]).inc();
    }

    pub fn record_close(&self, pool: PoolType, kind: CloseKind) {
        self.positions_closed
            .with_label_values(&[pool.as_str(), kind.as_str()])
            .inc();
    }

    pub fn record_rewards(&self, pool: PoolType, amount: f64) {
        if amount > 0.0 {
            self.rewards_paid.with_label_values(&[pool.as_str()]).inc_by(amount);
        }
    }

    /// Mirror a pool's running totals into the gauges
    pub fn update_pool(&self, stats: &PoolStatistics) {
        let label = stats.pool_type.as_str();
        self.pool_total_staked.with_label_values(&[label]).set(stats.total_staked);
        self.pool_participants
            .with_label_values(&[label])
            .set(i64::try_from(stats.total_participants).unwrap_or(i64::MAX));
    }

    /// Export metrics in the Prometheus text format
    pub fn export_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_registries() {
        let first = StakingMonitor::new().unwrap();
        let second = StakingMonitor::new().unwrap();

        first.record_open(PoolType::CrossDimension);
        first.record_close(PoolType::CrossDimension, CloseKind::Emergency);
        first.record_rewards(PoolType::CrossDimension, 12.5);

        let text = first.export_metrics().unwrap();
        assert!(text.contains("staking_positions_opened_total{pool=\"CROSS_DIMENSION\"} 1"));
        assert!(text.contains("kind=\"emergency\""));
        assert!(!second.export_metrics().unwrap().contains("CROSS_DIMENSION"));
    }
}
