//! Core ledger types: assets, dimensions, pools and positions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StakingError;

/// Well-known asset category labels. The category set is open; these are the
/// labels the boost events look for.
pub mod categories {
    pub const REAL_ESTATE: &str = "real_estate";
    pub const GOLD: &str = "gold";
    pub const FIAT_CURRENCY: &str = "fiat_currency";
    pub const QUANTUM_ENTANGLED_PROPERTY: &str = "quantum_entangled_property";
    pub const QI_ENERGY_FUTURES: &str = "qi_energy_futures";
    pub const WISH_COIN: &str = "wish_coin";
    pub const PARALLEL_TIME_BANK: &str = "parallel_time_bank";
    pub const REALITY_DISTORTION_FIELD: &str = "reality_distortion_field";
    pub const ANTIMATTER_STORAGE: &str = "antimatter_storage";
    pub const SPIRITUAL_CREDIT: &str = "spiritual_credit";
    pub const CONSCIOUSNESS_TOKEN: &str = "consciousness_token";
    pub const KARMA_BOND: &str = "karma_bond";
    pub const SOUL_FRAGMENT: &str = "soul_fragment";
    pub const COSMIC_SHARE: &str = "cosmic_share";
}

/// Origin dimension of an asset. Each dimension carries a fixed exchange multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Physical,
    Energy,
    Information,
    Time,
    Consciousness,
    Quantum,
    Spiritual,
    Metaverse,
}

impl Dimension {
    /// Value multiplier applied to assets originating in this dimension
    pub fn multiplier(&self) -> f64 {
        match self {
            Dimension::Physical => 1.0,
            Dimension::Energy => 3.14159,
            Dimension::Information => 2.71828,
            Dimension::Time => 1.618,
            Dimension::Consciousness => 7.389,
            Dimension::Quantum => 9.869,
            Dimension::Spiritual => 13.0,
            Dimension::Metaverse => 21.0,
        }
    }
}

/// A valued item declared for staking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub dimension: Dimension,
    pub base_value: f64,
    pub owner_id: String,
    pub replication_count: u32,
    pub entanglement_degree: f64, // 0..=1
    pub energy_score: f64,
    pub consciousness_tier: u32,
    pub anchor_strength: f64,
    pub time_factor: f64, // >= 1
}

impl Asset {
    /// Create an asset with neutral modifiers
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        dimension: Dimension,
        base_value: f64,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: category.into(),
            dimension,
            base_value,
            owner_id: owner_id.into(),
            replication_count: 1,
            entanglement_degree: 0.0,
            energy_score: 0.0,
            consciousness_tier: 1,
            anchor_strength: 0.0,
            time_factor: 1.0,
        }
    }

    pub fn with_replication(mut self, replication_count: u32) -> Self {
        self.replication_count = replication_count;
        self
    }

    pub fn with_entanglement(mut self, degree: f64) -> Self {
        self.entanglement_degree = degree;
        self
    }

    pub fn with_energy(mut self, energy_score: f64) -> Self {
        self.energy_score = energy_score;
        self
    }

    pub fn with_consciousness_tier(mut self, tier: u32) -> Self {
        self.consciousness_tier = tier;
        self
    }

    pub fn with_anchor(mut self, anchor_strength: f64) -> Self {
        self.anchor_strength = anchor_strength;
        self
    }

    pub fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    /// Check the modifier ranges an asset must satisfy before it can be staked
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.id.trim().is_empty() {
            return Err(StakingError::validation("asset id must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(StakingError::validation(format!(
                "asset {} has an empty category",
                self.id
            )));
        }

        let numbers = [
            ("base_value", self.base_value),
            ("entanglement_degree", self.entanglement_degree),
            ("energy_score", self.energy_score),
            ("anchor_strength", self.anchor_strength),
            ("time_factor", self.time_factor),
        ];
        for (field, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(StakingError::validation(format!(
                    "asset {}: {} must be a non-negative number, got {}",
                    self.id, field, value
                )));
            }
        }

        if self.entanglement_degree > 1.0 {
            return Err(StakingError::validation(format!(
                "asset {}: entanglement_degree must be within [0, 1], got {}",
                self.id, self.entanglement_degree
            )));
        }
        if self.time_factor < 1.0 {
            return Err(StakingError::validation(format!(
                "asset {}: time_factor must be at least 1, got {}",
                self.id, self.time_factor
            )));
        }
        if self.replication_count < 1 {
            return Err(StakingError::validation(format!(
                "asset {}: replication_count must be at least 1",
                self.id
            )));
        }
        if self.consciousness_tier < 1 {
            return Err(StakingError::validation(format!(
                "asset {}: consciousness_tier must be at least 1",
                self.id
            )));
        }

        Ok(())
    }

    /// Raise entanglement, clamping the result to [0, 1]
    pub fn boost_entanglement(&mut self, delta: f64) -> Result<(), StakingError> {
        ensure_non_negative("entanglement delta", delta)?;
        self.entanglement_degree = (self.entanglement_degree + delta).clamp(0.0, 1.0);
        Ok(())
    }

    pub fn boost_consciousness(&mut self, tier_delta: u32, energy_delta: f64) -> Result<(), StakingError> {
        ensure_non_negative("energy delta", energy_delta)?;
        let energy_score = finite_sum(&self.id, "energy_score", self.energy_score, energy_delta)?;
        self.consciousness_tier = self.consciousness_tier.saturating_add(tier_delta);
        self.energy_score = energy_score;
        Ok(())
    }

    pub fn boost_anchor(&mut self, anchor_delta: f64, time_delta: f64) -> Result<(), StakingError> {
        ensure_non_negative("anchor delta", anchor_delta)?;
        ensure_non_negative("time delta", time_delta)?;
        let anchor_strength =
            finite_sum(&self.id, "anchor_strength", self.anchor_strength, anchor_delta)?;
        let time_factor = finite_sum(&self.id, "time_factor", self.time_factor, time_delta)?;
        self.anchor_strength = anchor_strength;
        self.time_factor = time_factor;
        Ok(())
    }
}

/// `current + delta`, or a validation error when the sum overflows
fn finite_sum(asset_id: &str, field: &str, current: f64, delta: f64) -> Result<f64, StakingError> {
    let sum = current + delta;
    if sum.is_finite() {
        Ok(sum)
    } else {
        Err(StakingError::validation(format!(
            "asset {}: {} would overflow",
            asset_id, field
        )))
    }
}

fn ensure_non_negative(what: &str, value: f64) -> Result<(), StakingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StakingError::validation(format!(
            "{} must be a non-negative number, got {}",
            what, value
        )))
    }
}

/// Reward program a position is committed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    SingleDimension,
    CrossDimension,
    QuantumEntangled,
    ConsciousnessSync,
    SpiritualAscension,
    RealityAnchor,
    TimeDilation,
    CosmicGovernance,
}

impl PoolType {
    pub const ALL: [PoolType; 8] = [
        PoolType::SingleDimension,
        PoolType::CrossDimension,
        PoolType::QuantumEntangled,
        PoolType::ConsciousnessSync,
        PoolType::SpiritualAscension,
        PoolType::RealityAnchor,
        PoolType::TimeDilation,
        PoolType::CosmicGovernance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolType::SingleDimension => "SINGLE_DIMENSION",
            PoolType::CrossDimension => "CROSS_DIMENSION",
            PoolType::QuantumEntangled => "QUANTUM_ENTANGLED",
            PoolType::ConsciousnessSync => "CONSCIOUSNESS_SYNC",
            PoolType::SpiritualAscension => "SPIRITUAL_ASCENSION",
            PoolType::RealityAnchor => "REALITY_ANCHOR",
            PoolType::TimeDilation => "TIME_DILATION",
            PoolType::CosmicGovernance => "COSMIC_GOVERNANCE",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = StakingError;

    /// Accepts `CROSS_DIMENSION`, `cross_dimension` and `cross-dimension`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        PoolType::ALL
            .into_iter()
            .find(|pool| pool.as_str() == normalized)
            .ok_or_else(|| StakingError::validation(format!("unknown pool type '{}'", s)))
    }
}

/// Static parameters of a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pool_type: PoolType,
    pub base_apy: f64,
    pub min_stake: f64,
    pub allowed_lock_days: Vec<u32>,
    pub description: String,
}

impl PoolConfig {
    pub fn allows_lock(&self, lock_days: u32) -> bool {
        self.allowed_lock_days.contains(&lock_days)
    }
}

/// A pool together with its running totals
#[derive(Debug, Clone)]
pub struct StakingPool {
    pub config: PoolConfig,
    pub total_staked: f64,
    pub total_participants: u64,
}

impl StakingPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            total_staked: 0.0,
            total_participants: 0,
        }
    }

    pub(crate) fn record_stake(&mut self, value: f64) {
        self.total_staked += value;
        self.total_participants += 1;
    }

    pub(crate) fn release_stake(&mut self, value: f64) {
        self.total_staked = (self.total_staked - value).max(0.0);
        self.total_participants = self.total_participants.saturating_sub(1);
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            pool_type: self.config.pool_type,
            description: self.config.description.clone(),
            base_apy: self.config.base_apy,
            min_stake: self.config.min_stake,
            allowed_lock_days: self.config.allowed_lock_days.clone(),
            total_staked: self.total_staked,
            total_participants: self.total_participants,
        }
    }
}

/// Public view of a pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatistics {
    pub pool_type: PoolType,
    pub description: String,
    pub base_apy: f64,
    pub min_stake: f64,
    pub allowed_lock_days: Vec<u32>,
    pub total_staked: f64,
    pub total_participants: u64,
}

/// Bonuses derived from a position's assets, cached on the position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMultipliers {
    pub quantum_multiplier: f64,
    pub sync_bonus: f64,
    pub ascension_level: u32,
    pub distortion_power: f64,
    pub synergy_factor: f64,
}

impl Default for PositionMultipliers {
    fn default() -> Self {
        Self {
            quantum_multiplier: 1.0,
            sync_bonus: 0.0,
            ascension_level: 0,
            distortion_power: 0.0,
            synergy_factor: 1.0,
        }
    }
}

/// A user's commitment of assets to one pool for one lock period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingPosition {
    pub position_id: String,
    pub owner_id: String,
    pub pool_type: PoolType,
    pub assets: Vec<Asset>,
    pub stake_value: f64,
    pub stake_time: DateTime<Utc>,
    pub lock_days: u32,
    pub unlock_time: DateTime<Utc>,
    pub expected_apy: f64,
    pub accumulated_rewards: f64,
    #[serde(flatten)]
    pub multipliers: PositionMultipliers,
    pub active: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl StakingPosition {
    pub fn lock_duration(&self) -> Duration {
        Duration::days(i64::from(self.lock_days))
    }

    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_time
    }

    /// Whole days left until unlock, rounded up
    pub fn remaining_lock_days(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.unlock_time - now).num_seconds();
        if seconds <= 0 {
            0
        } else {
            (seconds + 86_399) / 86_400
        }
    }

    pub fn asset_mut(&mut self, asset_id: &str) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|asset| asset.id == asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_type_parsing() {
        assert_eq!("CROSS_DIMENSION".parse::<PoolType>().unwrap(), PoolType::CrossDimension);
        assert_eq!("cross-dimension".parse::<PoolType>().unwrap(), PoolType::CrossDimension);
        assert_eq!("time_dilation".parse::<PoolType>().unwrap(), PoolType::TimeDilation);
        assert!("galactic".parse::<PoolType>().is_err());
    }

    #[test]
    fn test_pool_type_serde_matches_display() {
        for pool in PoolType::ALL {
            let json = serde_json::to_string(&pool).unwrap();
            assert_eq!(json, format!("\"{}\"", pool));
        }
    }

    #[test]
    fn test_asset_validation() {
        let asset = Asset::new("a1", categories::GOLD, Dimension::Physical, 1000.0, "u1");
        assert!(asset.validate().is_ok());

        assert!(asset.clone().with_entanglement(1.2).validate().is_err());
        assert!(asset.clone().with_energy(-1.0).validate().is_err());
        assert!(asset.clone().with_time_factor(0.5).validate().is_err());
        assert!(asset.clone().with_replication(0).validate().is_err());
        assert!(asset.clone().with_consciousness_tier(0).validate().is_err());

        let mut bad_value = asset.clone();
        bad_value.base_value = f64::NAN;
        assert!(bad_value.validate().is_err());
    }

    #[test]
    fn test_entanglement_boost_clamps() {
        let mut asset = Asset::new("a1", categories::GOLD, Dimension::Quantum, 10.0, "u1")
            .with_entanglement(0.95);
        asset.boost_entanglement(0.2).unwrap();
        assert_eq!(asset.entanglement_degree, 1.0);
        assert!(asset.boost_entanglement(-0.1).is_err());
    }

    #[test]
    fn test_boost_overflow_leaves_asset_unchanged() {
        let mut asset = Asset::new("r1", categories::REALITY_DISTORTION_FIELD, Dimension::Metaverse, 10.0, "u1")
            .with_energy(f64::MAX)
            .with_anchor(f64::MAX);

        assert!(asset.boost_consciousness(2, f64::MAX).is_err());
        assert_eq!(asset.consciousness_tier, 1);
        assert_eq!(asset.energy_score, f64::MAX);

        assert!(asset.boost_anchor(f64::MAX, 0.5).is_err());
        assert_eq!(asset.anchor_strength, f64::MAX);
        assert_eq!(asset.time_factor, 1.0);

        assert!(asset.boost_anchor(0.0, f64::MAX).is_ok());
        assert!(asset.boost_anchor(0.0, f64::MAX).is_err());
        assert_eq!(asset.time_factor, 1.0 + f64::MAX);
    }

    #[test]
    fn test_remaining_lock_days_rounds_up() {
        let now = Utc::now();
        let position = StakingPosition {
            position_id: "stake_1".to_string(),
            owner_id: "u1".to_string(),
            pool_type: PoolType::SingleDimension,
            assets: vec![],
            stake_value: 0.0,
            stake_time: now,
            lock_days: 30,
            unlock_time: now + Duration::days(30),
            expected_apy: 0.1,
            accumulated_rewards: 0.0,
            multipliers: PositionMultipliers::default(),
            active: true,
            closed_at: None,
        };

        assert_eq!(position.remaining_lock_days(now), 30);
        assert_eq!(position.remaining_lock_days(now + Duration::hours(1)), 30);
        assert_eq!(position.remaining_lock_days(now + Duration::days(29) + Duration::hours(23)), 1);
        assert_eq!(position.remaining_lock_days(now + Duration::days(31)), 0);
    }
}
