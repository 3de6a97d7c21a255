//! Valuation, APY and reward accrual formulas
//!
//! Everything here is a pure function of its inputs. The constants are opaque
//! tuning knobs carried over unchanged from the reward model.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::error::{Result, StakingError};
use super::types::{Asset, PoolType, PositionMultipliers, StakingPosition};

pub const ENTANGLEMENT_VALUE_WEIGHT: f64 = 2.0;
pub const ENERGY_VALUE_DIVISOR: f64 = 1000.0;
pub const TIER_VALUE_WEIGHT: f64 = 0.1;
pub const ANCHOR_VALUE_WEIGHT: f64 = 0.5;

pub const LOCK_APY_WEIGHT: f64 = 0.1;
pub const DIMENSION_APY_BONUS: f64 = 0.05;
pub const ENTANGLEMENT_APY_WEIGHT: f64 = 0.2;
pub const ENERGY_APY_WEIGHT: f64 = 0.15;
pub const TIER_APY_WEIGHT: f64 = 0.02;
pub const SPIRITUAL_POOL_ENERGY_DIVISOR: f64 = 500.0;
pub const CONSCIOUSNESS_POOL_TIER_WEIGHT: f64 = 0.1;
pub const COSMIC_POOL_MULTIPLIER: f64 = 2.718;
pub const MAX_APY: f64 = 0.99;

pub const SYNC_BONUS_PER_TIER: f64 = 0.05;
pub const ENERGY_PER_ASCENSION_LEVEL: f64 = 1000.0;
pub const SYNERGY_PER_DIMENSION: f64 = 0.1;

pub const ASCENSION_DAILY_REWARD: f64 = 100.0;
pub const DISTORTION_DAILY_REWARD: f64 = 500.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Modifier-adjusted value of a single asset
pub fn asset_value(asset: &Asset) -> f64 {
    let entanglement_bonus = 1.0 + asset.entanglement_degree * ENTANGLEMENT_VALUE_WEIGHT;
    let energy_bonus = 1.0 + asset.energy_score / ENERGY_VALUE_DIVISOR;
    let tier_bonus = 1.0 + f64::from(asset.consciousness_tier) * TIER_VALUE_WEIGHT;
    let replication_bonus = f64::from(asset.replication_count).sqrt();
    let anchor_bonus = 1.0 + asset.anchor_strength * ANCHOR_VALUE_WEIGHT;

    asset.base_value
        * asset.dimension.multiplier()
        * entanglement_bonus
        * energy_bonus
        * tier_bonus
        * replication_bonus
        * anchor_bonus
        * asset.time_factor
}

/// Composite value of a set of assets
pub fn composite_value(assets: &[Asset]) -> Result<f64> {
    if assets.is_empty() {
        return Err(StakingError::validation("at least one asset is required"));
    }
    Ok(assets.iter().map(asset_value).sum())
}

/// Averages over a set of assets that feed the APY and bonus formulas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetAverages {
    pub entanglement: f64,
    pub energy: f64,
    pub tier: f64,
    pub anchor: f64,
    pub distinct_dimensions: usize,
}

impl AssetAverages {
    pub fn of(assets: &[Asset]) -> Self {
        let count = assets.len().max(1) as f64;
        let distinct_dimensions = assets
            .iter()
            .map(|asset| asset.dimension)
            .collect::<HashSet<_>>()
            .len();

        Self {
            entanglement: assets.iter().map(|a| a.entanglement_degree).sum::<f64>() / count,
            energy: assets.iter().map(|a| a.energy_score).sum::<f64>() / count,
            tier: assets.iter().map(|a| f64::from(a.consciousness_tier)).sum::<f64>() / count,
            anchor: assets.iter().map(|a| a.anchor_strength).sum::<f64>() / count,
            distinct_dimensions,
        }
    }

    fn extra_dimensions(&self) -> f64 {
        self.distinct_dimensions.saturating_sub(1) as f64
    }
}

/// Pool-specific multiplicative APY adjustment
pub fn pool_apy_adjustment(pool_type: PoolType, averages: &AssetAverages) -> f64 {
    match pool_type {
        PoolType::QuantumEntangled => 1.0 + averages.entanglement,
        PoolType::SpiritualAscension => 1.0 + averages.energy / SPIRITUAL_POOL_ENERGY_DIVISOR,
        PoolType::ConsciousnessSync => 1.0 + averages.tier * CONSCIOUSNESS_POOL_TIER_WEIGHT,
        PoolType::CosmicGovernance => COSMIC_POOL_MULTIPLIER,
        _ => 1.0,
    }
}

/// Expected APY for a set of assets entering a pool, capped at [`MAX_APY`]
pub fn dynamic_apy(assets: &[Asset], pool_type: PoolType, lock_days: u32, base_apy: f64) -> f64 {
    let averages = AssetAverages::of(assets);

    let mut apy = base_apy;
    apy += f64::from(lock_days) / DAYS_PER_YEAR * LOCK_APY_WEIGHT;
    if averages.distinct_dimensions > 1 {
        apy += averages.extra_dimensions() * DIMENSION_APY_BONUS;
    }
    apy += averages.entanglement * ENTANGLEMENT_APY_WEIGHT;
    apy += averages.energy / ENERGY_VALUE_DIVISOR * ENERGY_APY_WEIGHT;
    apy += averages.tier * TIER_APY_WEIGHT;

    apy *= pool_apy_adjustment(pool_type, &averages);
    apy.min(MAX_APY)
}

/// Bonuses cached on a position, recomputed whenever its assets change
pub fn position_multipliers(assets: &[Asset]) -> PositionMultipliers {
    let averages = AssetAverages::of(assets);

    PositionMultipliers {
        quantum_multiplier: 1.0 + averages.entanglement,
        sync_bonus: averages.tier * SYNC_BONUS_PER_TIER,
        ascension_level: (averages.energy / ENERGY_PER_ASCENSION_LEVEL).floor() as u32,
        distortion_power: averages.anchor,
        synergy_factor: 1.0 + averages.extra_dimensions() * SYNERGY_PER_DIMENSION,
    }
}

/// Whole days elapsed between two instants; negative when `now` precedes `since`
pub fn days_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_days()
}

/// Total rewards a position has earned by `now`.
///
/// Closed positions report their final accumulated rewards.
pub fn accrue_rewards(position: &StakingPosition, now: DateTime<Utc>) -> f64 {
    if !position.active {
        return position.accumulated_rewards;
    }

    let days = days_elapsed(position.stake_time, now);
    if days <= 0 {
        return 0.0;
    }
    let days = days as f64;

    let daily_rate = position.expected_apy / DAYS_PER_YEAR;
    let m = &position.multipliers;

    let base = position.stake_value * daily_rate * days;
    let mut total = base * m.quantum_multiplier * m.synergy_factor;
    total += m.sync_bonus * days;
    total += f64::from(m.ascension_level) * ASCENSION_DAILY_REWARD * days;
    total += m.distortion_power * DISTORTION_DAILY_REWARD * days;

    // dilated assets earn extra on their raw value
    total += position
        .assets
        .iter()
        .filter(|asset| asset.time_factor > 1.0)
        .map(|asset| (asset.time_factor - 1.0) * asset.base_value * daily_rate * days)
        .sum::<f64>();

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::types::{categories, Dimension};
    use chrono::Duration;

    fn neutral(value: f64) -> Asset {
        Asset::new("a1", categories::GOLD, Dimension::Physical, value, "u1")
    }

    fn position_with(assets: Vec<Asset>, apy: f64) -> StakingPosition {
        let stake_time = Utc::now();
        StakingPosition {
            position_id: "stake_test".to_string(),
            owner_id: "u1".to_string(),
            pool_type: PoolType::CrossDimension,
            stake_value: composite_value(&assets).unwrap(),
            multipliers: position_multipliers(&assets),
            assets,
            stake_time,
            lock_days: 90,
            unlock_time: stake_time + Duration::days(90),
            expected_apy: apy,
            accumulated_rewards: 0.0,
            active: true,
            closed_at: None,
        }
    }

    #[test]
    fn test_neutral_asset_value() {
        let value = composite_value(&[neutral(1000.0)]).unwrap();
        assert!((value - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_assets_rejected() {
        assert!(matches!(composite_value(&[]), Err(StakingError::Validation(_))));
    }

    #[test]
    fn test_value_monotonic_in_each_modifier() {
        let base = neutral(500.0).with_entanglement(0.2).with_energy(100.0);
        let v0 = asset_value(&base);

        let bumped = [
            base.clone().with_entanglement(0.6),
            base.clone().with_energy(900.0),
            base.clone().with_consciousness_tier(4),
            base.clone().with_replication(9),
            base.clone().with_anchor(2.0),
            base.clone().with_time_factor(1.5),
        ];
        for asset in bumped {
            assert!(asset_value(&asset) > v0, "{:?}", asset);
        }

        let mut richer = base.clone();
        richer.base_value = 501.0;
        assert!(asset_value(&richer) > v0);
    }

    #[test]
    fn test_dimension_multiplier_applies() {
        let mut asset = neutral(100.0);
        asset.dimension = Dimension::Metaverse;
        assert!((asset_value(&asset) - 100.0 * 21.0 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_cross_dimension_apy() {
        let assets = vec![
            Asset::new("qp", categories::QUANTUM_ENTANGLED_PROPERTY, Dimension::Quantum, 600_000.0, "u1")
                .with_replication(3)
                .with_entanglement(0.8)
                .with_energy(500.0),
            Asset::new("wc", categories::WISH_COIN, Dimension::Consciousness, 50_000.0, "u1")
                .with_consciousness_tier(5)
                .with_energy(1000.0),
        ];

        let apy = dynamic_apy(&assets, PoolType::CrossDimension, 365, 0.15);
        // 0.15 + 0.1 + 0.05 + 0.4*0.2 + 0.75*0.15 + 3*0.02
        assert!((apy - 0.5525).abs() < 1e-9);
        assert!(apy > 0.15 && apy <= MAX_APY);
    }

    #[test]
    fn test_apy_is_capped() {
        let assets = vec![neutral(1_000_000.0).with_consciousness_tier(40)];
        let apy = dynamic_apy(&assets, PoolType::CosmicGovernance, 2920, 0.88);
        assert_eq!(apy, MAX_APY);
    }

    #[test]
    fn test_pool_adjustments() {
        let assets = vec![neutral(1.0).with_entanglement(0.5).with_energy(250.0).with_consciousness_tier(2)];
        let averages = AssetAverages::of(&assets);

        assert!((pool_apy_adjustment(PoolType::QuantumEntangled, &averages) - 1.5).abs() < 1e-12);
        assert!((pool_apy_adjustment(PoolType::SpiritualAscension, &averages) - 1.5).abs() < 1e-12);
        assert!((pool_apy_adjustment(PoolType::ConsciousnessSync, &averages) - 1.2).abs() < 1e-12);
        assert_eq!(pool_apy_adjustment(PoolType::CosmicGovernance, &averages), 2.718);
        assert_eq!(pool_apy_adjustment(PoolType::RealityAnchor, &averages), 1.0);
    }

    #[test]
    fn test_position_multipliers() {
        let assets = vec![
            neutral(1.0).with_entanglement(0.4).with_energy(2500.0).with_anchor(1.0),
            Asset::new("a2", categories::WISH_COIN, Dimension::Energy, 1.0, "u1")
                .with_consciousness_tier(3)
                .with_energy(500.0),
        ];
        let m = position_multipliers(&assets);

        assert!((m.quantum_multiplier - 1.2).abs() < 1e-12);
        assert!((m.sync_bonus - 0.1).abs() < 1e-12);
        assert_eq!(m.ascension_level, 1);
        assert!((m.distortion_power - 0.5).abs() < 1e-12);
        assert!((m.synergy_factor - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_no_rewards_before_first_day() {
        let position = position_with(vec![neutral(10_000.0)], 0.2);
        assert_eq!(accrue_rewards(&position, position.stake_time), 0.0);
        assert_eq!(accrue_rewards(&position, position.stake_time + Duration::hours(23)), 0.0);
        assert_eq!(accrue_rewards(&position, position.stake_time - Duration::days(3)), 0.0);
    }

    #[test]
    fn test_accrual_formula() {
        let position = position_with(vec![neutral(10_000.0)], 0.365);
        let rewards = accrue_rewards(&position, position.stake_time + Duration::days(10));

        // 11000 * 0.001 * 10 plus the tier-1 sync bonus of 0.05/day
        assert!((rewards - (110.0 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_time_dilation_bonus() {
        let plain = position_with(vec![neutral(1000.0)], 0.365);
        let dilated = position_with(vec![neutral(1000.0).with_time_factor(2.0)], 0.365);
        let at = |p: &StakingPosition| accrue_rewards(p, p.stake_time + Duration::days(1));

        // doubled stake value plus 1 * 1000 * 0.001 of dilation bonus
        let expected = 2200.0 * 0.001 + 0.05 + 1.0;
        assert!((at(&dilated) - expected).abs() < 1e-9);
        assert!(at(&dilated) > at(&plain));
    }

    #[test]
    fn test_accrual_monotonic_in_time() {
        let assets = vec![
            neutral(5000.0).with_entanglement(0.3).with_anchor(0.2).with_time_factor(1.3),
            Asset::new("a2", categories::SOUL_FRAGMENT, Dimension::Spiritual, 800.0, "u1").with_energy(1500.0),
        ];
        let position = position_with(assets, 0.4);

        let mut previous = 0.0;
        for day in 0..400 {
            let rewards = accrue_rewards(&position, position.stake_time + Duration::days(day));
            assert!(rewards >= previous);
            previous = rewards;
        }
    }

    #[test]
    fn test_closed_position_reports_accumulated() {
        let mut position = position_with(vec![neutral(10_000.0)], 0.2);
        position.active = false;
        position.accumulated_rewards = 42.0;
        assert_eq!(accrue_rewards(&position, position.stake_time + Duration::days(500)), 42.0);
    }
}
