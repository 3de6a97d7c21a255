//! Pool table and running pool totals

use std::collections::HashMap;

use super::error::{Result, StakingError};
use super::types::{PoolConfig, PoolStatistics, PoolType, StakingPool};

/// The pool menu offered when no overrides are configured
pub fn default_pool_configs() -> Vec<PoolConfig> {
    let pool = |pool_type, base_apy, min_stake, lock_days: [u32; 4], description: &str| PoolConfig {
        pool_type,
        base_apy,
        min_stake,
        allowed_lock_days: lock_days.to_vec(),
        description: description.to_string(),
    };

    vec![
        pool(
            PoolType::SingleDimension,
            0.08,
            1_000.0,
            [30, 90, 180, 365],
            "Single-dimension assets with steady returns",
        ),
        pool(
            PoolType::CrossDimension,
            0.15,
            5_000.0,
            [90, 180, 365, 730],
            "Multi-dimension portfolios earning a synergy bonus",
        ),
        pool(
            PoolType::QuantumEntangled,
            0.25,
            10_000.0,
            [180, 365, 730, 1095],
            "Returns grow with the entanglement of staked assets",
        ),
        pool(
            PoolType::ConsciousnessSync,
            0.20,
            8_000.0,
            [90, 180, 365, 730],
            "Meditation and practice raise consciousness tiers for extra yield",
        ),
        pool(
            PoolType::SpiritualAscension,
            0.30,
            15_000.0,
            [365, 730, 1095, 1460],
            "Spiritual energy converted into economic yield",
        ),
        pool(
            PoolType::RealityAnchor,
            0.40,
            25_000.0,
            [730, 1095, 1460, 1825],
            "Reality anchors that bend the physical world for outsized yield",
        ),
        pool(
            PoolType::TimeDilation,
            0.50,
            50_000.0,
            [1095, 1460, 1825, 2190],
            "Time-dilated assets that harvest future returns",
        ),
        pool(
            PoolType::CosmicGovernance,
            0.88,
            100_000.0,
            [1825, 2190, 2555, 2920],
            "Long-horizon governance stake in multiverse decisions",
        ),
    ]
}

/// All pools keyed by type. Lives behind the ledger lock.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: HashMap<PoolType, StakingPool>,
}

impl PoolRegistry {
    pub fn new(configs: Vec<PoolConfig>) -> Self {
        let pools = configs
            .into_iter()
            .map(|config| (config.pool_type, StakingPool::new(config)))
            .collect();
        Self { pools }
    }

    pub fn get(&self, pool_type: PoolType) -> Result<&StakingPool> {
        self.pools
            .get(&pool_type)
            .ok_or_else(|| StakingError::validation(format!("pool {} is not offered", pool_type)))
    }

    pub fn get_mut(&mut self, pool_type: PoolType) -> Result<&mut StakingPool> {
        self.pools
            .get_mut(&pool_type)
            .ok_or_else(|| StakingError::validation(format!("pool {} is not offered", pool_type)))
    }

    /// Statistics for every configured pool, in menu order
    pub fn statistics(&self) -> Vec<PoolStatistics> {
        PoolType::ALL
            .iter()
            .filter_map(|pool_type| self.pools.get(pool_type))
            .map(StakingPool::statistics)
            .collect()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(default_pool_configs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_every_pool() {
        let registry = PoolRegistry::default();
        let stats = registry.statistics();

        assert_eq!(stats.len(), 8);
        let order: Vec<PoolType> = stats.iter().map(|s| s.pool_type).collect();
        assert_eq!(order, PoolType::ALL.to_vec());

        let cross = registry.get(PoolType::CrossDimension).unwrap();
        assert_eq!(cross.config.base_apy, 0.15);
        assert_eq!(cross.config.min_stake, 5_000.0);
        assert!(cross.config.allows_lock(365));
        assert!(!cross.config.allows_lock(30));
    }

    #[test]
    fn test_totals_never_go_negative() {
        let mut registry = PoolRegistry::default();
        let pool = registry.get_mut(PoolType::SingleDimension).unwrap();

        pool.record_stake(1500.0);
        pool.release_stake(1500.0);
        pool.release_stake(1500.0);

        assert_eq!(pool.total_staked, 0.0);
        assert_eq!(pool.total_participants, 0);
    }

    #[test]
    fn test_missing_pool_is_rejected() {
        let registry = PoolRegistry::new(vec![]);
        assert!(matches!(
            registry.get(PoolType::TimeDilation),
            Err(StakingError::Validation(_))
        ));
    }
}
