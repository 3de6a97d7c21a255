//! Staking ledger engine
//!
//! Owns the pool table and drives every position through its lifecycle:
//! open, claim and boost while open, then close (normal or emergency).
//! A single ledger lock serializes all mutations so pool totals always agree
//! with the position store.

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::error::{Result, StakingError};
use super::pools::{default_pool_configs, PoolRegistry};
use super::store::{InMemoryPositionStore, PositionStore};
use super::types::{categories, Asset, PoolConfig, PoolStatistics, PoolType, StakingPosition};
use super::valuation;
use crate::monitoring::staking_monitor::{CloseKind, StakingMonitor};

pub const DEFAULT_EMERGENCY_PENALTY_RATE: f64 = 0.1;

/// Range of the entanglement gain applied by a quantum entanglement event
const QUANTUM_EVENT_MIN_GAIN: f64 = 0.01;
const QUANTUM_EVENT_MAX_GAIN: f64 = 0.1;

const MEDITATION_TIERS_PER_QUALITY: f64 = 10.0;
const MEDITATION_ENERGY_PER_QUALITY: f64 = 100.0;
const DISTORTION_ANCHOR_PER_INTENTION: f64 = 0.1;
const DISTORTION_TIME_PER_INTENTION: f64 = 0.05;

/// Tunables for an engine instance
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub emergency_penalty_rate: f64,
    /// Seed for the event PRNG; `None` seeds from OS entropy
    pub rng_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            emergency_penalty_rate: DEFAULT_EMERGENCY_PENALTY_RATE,
            rng_seed: None,
        }
    }
}

/// Rewards owed to a position at a point in time
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RewardQuote {
    pub accrued: f64,
    pub claimable: f64,
    pub days_staked: i64,
}

/// What a closed position hands back to its owner
#[derive(Debug, Clone, Serialize)]
pub struct ClosedPosition {
    pub position_id: String,
    pub assets: Vec<Asset>,
    pub rewards: f64,
}

struct LedgerState {
    pools: PoolRegistry,
    rng: StdRng,
}

pub struct StakingEngine {
    ledger: Mutex<LedgerState>,
    store: Arc<dyn PositionStore>,
    clock: Arc<dyn Clock>,
    monitor: StakingMonitor,
    settings: EngineSettings,
}

impl StakingEngine {
    pub fn new(
        pool_configs: Vec<PoolConfig>,
        store: Arc<dyn PositionStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.emergency_penalty_rate) {
            return Err(StakingError::validation(format!(
                "emergency penalty rate must be within [0, 1], got {}",
                settings.emergency_penalty_rate
            )));
        }

        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let pools = PoolRegistry::new(pool_configs);
        let monitor = StakingMonitor::new()?;
        for stats in pools.statistics() {
            monitor.update_pool(&stats);
        }

        Ok(Self {
            ledger: Mutex::new(LedgerState { pools, rng }),
            store,
            clock,
            monitor,
            settings,
        })
    }

    /// Engine over the default pool table and an in-memory store
    pub fn in_memory(clock: Arc<dyn Clock>, settings: EngineSettings) -> Result<Self> {
        Self::new(
            default_pool_configs(),
            Arc::new(InMemoryPositionStore::new()),
            clock,
            settings,
        )
    }

    pub fn monitor(&self) -> &StakingMonitor {
        &self.monitor
    }

    /// Stake a set of assets into a pool for one of its lock periods
    pub async fn open_position(
        &self,
        owner_id: &str,
        assets: Vec<Asset>,
        pool_type: PoolType,
        lock_days: u32,
    ) -> Result<StakingPosition> {
        validate_assets(owner_id, &assets)?;

        let mut ledger = self.ledger.lock().await;
        let pool = ledger.pools.get(pool_type)?;

        let stake_value = valuation::composite_value(&assets)?;
        if !stake_value.is_finite() {
            return Err(StakingError::validation(
                "composite value of the assets is too large to stake",
            ));
        }
        if stake_value < pool.config.min_stake {
            debug!(owner_id, pool = %pool_type, stake_value, "Stake below pool minimum");
            return Err(StakingError::InsufficientStake {
                pool: pool_type,
                required: pool.config.min_stake,
                provided: stake_value,
            });
        }
        if !pool.config.allows_lock(lock_days) {
            return Err(StakingError::InvalidLockPeriod {
                pool: pool_type,
                requested: lock_days,
                allowed: pool.config.allowed_lock_days.clone(),
            });
        }

        let expected_apy =
            valuation::dynamic_apy(&assets, pool_type, lock_days, pool.config.base_apy);
        let stake_time = self.clock.now();

        let mut position = StakingPosition {
            position_id: format!("stake_{}", Uuid::new_v4()),
            owner_id: owner_id.to_string(),
            pool_type,
            multipliers: valuation::position_multipliers(&assets),
            assets,
            stake_value,
            stake_time,
            lock_days,
            unlock_time: stake_time,
            expected_apy,
            accumulated_rewards: 0.0,
            active: true,
            closed_at: None,
        };
        position.unlock_time = stake_time + position.lock_duration();

        self.store.put(position.clone()).await?;

        let pool = ledger.pools.get_mut(pool_type)?;
        pool.record_stake(stake_value);
        self.monitor.record_open(pool_type);
        self.monitor.update_pool(&pool.statistics());

        info!(
            position_id = %position.position_id,
            owner_id,
            pool = %pool_type,
            stake_value,
            expected_apy,
            lock_days,
            "Staking position opened"
        );
        Ok(position)
    }

    pub async fn get_position(&self, position_id: &str) -> Result<StakingPosition> {
        self.store
            .get(position_id)
            .await?
            .ok_or_else(|| StakingError::PositionNotFound(position_id.to_string()))
    }

    pub async fn list_owner_positions(&self, owner_id: &str) -> Result<Vec<StakingPosition>> {
        self.store.list_by_owner(owner_id).await
    }

    pub async fn pool_statistics(&self) -> Vec<PoolStatistics> {
        self.ledger.lock().await.pools.statistics()
    }

    /// Total rewards earned by a position as of now
    pub async fn accrued_rewards(&self, position_id: &str) -> Result<f64> {
        let position = self.get_position(position_id).await?;
        Ok(valuation::accrue_rewards(&position, self.clock.now()))
    }

    /// Accrued and still-unclaimed rewards of a position as of now
    pub async fn quote_rewards(&self, position_id: &str) -> Result<RewardQuote> {
        let position = self.get_position(position_id).await?;
        let now = self.clock.now();
        let accrued = valuation::accrue_rewards(&position, now);

        Ok(RewardQuote {
            accrued,
            claimable: (accrued - position.accumulated_rewards).max(0.0),
            days_staked: valuation::days_elapsed(position.stake_time, now).max(0),
        })
    }

    /// Pay out everything accrued since the last claim
    pub async fn claim_rewards(&self, position_id: &str) -> Result<f64> {
        let _ledger = self.ledger.lock().await;
        let mut position = self.open_position_for_update(position_id).await?;

        let accrued = valuation::accrue_rewards(&position, self.clock.now());
        let claimed = (accrued - position.accumulated_rewards).max(0.0);
        position.accumulated_rewards = position.accumulated_rewards.max(accrued);
        self.store.put(position.clone()).await?;

        self.monitor.record_rewards(position.pool_type, claimed);
        info!(position_id, claimed, total = position.accumulated_rewards, "Rewards claimed");
        Ok(claimed)
    }

    /// Close an unlocked position, returning its assets and unclaimed rewards
    pub async fn close_position(&self, position_id: &str) -> Result<ClosedPosition> {
        let mut ledger = self.ledger.lock().await;
        let mut position = self.open_position_for_update(position_id).await?;
        let now = self.clock.now();

        if !position.is_unlocked(now) {
            let remaining_days = position.remaining_lock_days(now);
            debug!(position_id, remaining_days, "Close rejected, lock still active");
            return Err(StakingError::LockPeriodActive {
                position_id: position_id.to_string(),
                remaining_days,
                unlock_time: position.unlock_time,
            });
        }

        let accrued = valuation::accrue_rewards(&position, now);
        let rewards = (accrued - position.accumulated_rewards).max(0.0);
        position.accumulated_rewards = position.accumulated_rewards.max(accrued);

        self.finish_close(&mut ledger, position, now, rewards, CloseKind::Normal)
            .await
    }

    /// Close regardless of the lock, forfeiting `penalty_rate` of accrued rewards.
    ///
    /// Falls back to the configured emergency penalty when no rate is given.
    pub async fn emergency_close(
        &self,
        position_id: &str,
        penalty_rate: Option<f64>,
    ) -> Result<ClosedPosition> {
        let penalty_rate = penalty_rate.unwrap_or(self.settings.emergency_penalty_rate);
        if !penalty_rate.is_finite() || !(0.0..=1.0).contains(&penalty_rate) {
            return Err(StakingError::validation(format!(
                "penalty_rate must be within [0, 1], got {}",
                penalty_rate
            )));
        }

        let mut ledger = self.ledger.lock().await;
        let mut position = self.open_position_for_update(position_id).await?;
        let now = self.clock.now();

        let accrued = valuation::accrue_rewards(&position, now);
        let rewards = (accrued * (1.0 - penalty_rate)).max(0.0);
        position.accumulated_rewards = position.accumulated_rewards.max(accrued);

        warn!(
            position_id,
            penalty_rate,
            accrued,
            rewards,
            "Emergency close with penalty"
        );
        self.finish_close(&mut ledger, position, now, rewards, CloseKind::Emergency)
            .await
    }

    pub async fn boost_entanglement(
        &self,
        position_id: &str,
        asset_id: &str,
        delta: f64,
    ) -> Result<StakingPosition> {
        self.boost_asset(position_id, asset_id, |asset| asset.boost_entanglement(delta))
            .await
    }

    pub async fn boost_consciousness(
        &self,
        position_id: &str,
        asset_id: &str,
        tier_delta: u32,
        energy_delta: f64,
    ) -> Result<StakingPosition> {
        self.boost_asset(position_id, asset_id, |asset| {
            asset.boost_consciousness(tier_delta, energy_delta)
        })
        .await
    }

    pub async fn boost_anchor(
        &self,
        position_id: &str,
        asset_id: &str,
        anchor_delta: f64,
        time_delta: f64,
    ) -> Result<StakingPosition> {
        self.boost_asset(position_id, asset_id, |asset| {
            asset.boost_anchor(anchor_delta, time_delta)
        })
        .await
    }

    /// Randomly strengthen one asset in each of the owner's open quantum positions
    pub async fn quantum_entanglement_event(&self, owner_id: &str) -> Result<Vec<String>> {
        let mut ledger = self.ledger.lock().await;
        let mut touched = Vec::new();

        for mut position in self.open_owner_positions(owner_id, PoolType::QuantumEntangled).await? {
            if position.assets.is_empty() {
                continue;
            }
            let index = ledger.rng.gen_range(0..position.assets.len());
            let gain = ledger.rng.gen_range(QUANTUM_EVENT_MIN_GAIN..QUANTUM_EVENT_MAX_GAIN);
            position.assets[index].boost_entanglement(gain)?;

            touched.push(self.store_boosted(position).await?);
        }

        info!(owner_id, positions = touched.len(), "Quantum entanglement event applied");
        Ok(touched)
    }

    /// Raise consciousness tiers and energy of meditation-eligible assets
    pub async fn meditation_boost(&self, owner_id: &str, quality: f64) -> Result<Vec<String>> {
        ensure_event_strength("meditation quality", quality)?;
        let _ledger = self.ledger.lock().await;
        let tier_delta = (quality * MEDITATION_TIERS_PER_QUALITY).floor() as u32;
        let energy_delta = quality * MEDITATION_ENERGY_PER_QUALITY;
        let mut touched = Vec::new();

        for mut position in self.open_owner_positions(owner_id, PoolType::ConsciousnessSync).await? {
            for asset in position.assets.iter_mut().filter(|asset| {
                asset.category == categories::CONSCIOUSNESS_TOKEN
                    || asset.category == categories::SPIRITUAL_CREDIT
            }) {
                asset.boost_consciousness(tier_delta, energy_delta)?;
            }
            touched.push(self.store_boosted(position).await?);
        }

        info!(owner_id, quality, positions = touched.len(), "Meditation boost applied");
        Ok(touched)
    }

    /// Strengthen reality anchors and time dilation of distortion-field assets
    pub async fn reality_distortion(&self, owner_id: &str, intention_strength: f64) -> Result<Vec<String>> {
        ensure_event_strength("intention strength", intention_strength)?;
        let _ledger = self.ledger.lock().await;
        let anchor_delta = intention_strength * DISTORTION_ANCHOR_PER_INTENTION;
        let time_delta = intention_strength * DISTORTION_TIME_PER_INTENTION;
        let mut touched = Vec::new();

        for mut position in self.open_owner_positions(owner_id, PoolType::RealityAnchor).await? {
            for asset in position
                .assets
                .iter_mut()
                .filter(|asset| asset.category == categories::REALITY_DISTORTION_FIELD)
            {
                asset.boost_anchor(anchor_delta, time_delta)?;
            }
            touched.push(self.store_boosted(position).await?);
        }

        info!(owner_id, intention_strength, positions = touched.len(), "Reality distortion applied");
        Ok(touched)
    }

    async fn boost_asset<F>(&self, position_id: &str, asset_id: &str, boost: F) -> Result<StakingPosition>
    where
        F: FnOnce(&mut Asset) -> Result<()>,
    {
        let _ledger = self.ledger.lock().await;
        let mut position = self.open_position_for_update(position_id).await?;

        let asset = position
            .asset_mut(asset_id)
            .ok_or_else(|| StakingError::AssetNotFound {
                position_id: position_id.to_string(),
                asset_id: asset_id.to_string(),
            })?;
        boost(asset)?;

        position.multipliers = valuation::position_multipliers(&position.assets);
        self.store.put(position.clone()).await?;
        debug!(position_id, asset_id, multipliers = ?position.multipliers, "Asset boosted");
        Ok(position)
    }

    /// Recompute cached multipliers from current asset state and persist
    async fn store_boosted(&self, mut position: StakingPosition) -> Result<String> {
        position.multipliers = valuation::position_multipliers(&position.assets);
        let position_id = position.position_id.clone();
        debug!(position_id = %position_id, multipliers = ?position.multipliers, "Position multipliers recomputed");
        self.store.put(position).await?;
        Ok(position_id)
    }

    async fn open_position_for_update(&self, position_id: &str) -> Result<StakingPosition> {
        let position = self.get_position(position_id).await?;
        if !position.active {
            return Err(StakingError::PositionClosed(position_id.to_string()));
        }
        Ok(position)
    }

    async fn open_owner_positions(&self, owner_id: &str, pool_type: PoolType) -> Result<Vec<StakingPosition>> {
        Ok(self
            .store
            .list_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|position| position.active && position.pool_type == pool_type)
            .collect())
    }

    async fn finish_close(
        &self,
        ledger: &mut LedgerState,
        mut position: StakingPosition,
        now: DateTime<Utc>,
        rewards: f64,
        kind: CloseKind,
    ) -> Result<ClosedPosition> {
        position.active = false;
        position.closed_at = Some(now);
        self.store.put(position.clone()).await?;

        let pool = ledger.pools.get_mut(position.pool_type)?;
        pool.release_stake(position.stake_value);
        self.monitor.record_close(position.pool_type, kind);
        self.monitor.record_rewards(position.pool_type, rewards);
        self.monitor.update_pool(&pool.statistics());

        info!(
            position_id = %position.position_id,
            owner_id = %position.owner_id,
            pool = %position.pool_type,
            rewards,
            kind = ?kind,
            "Staking position closed"
        );

        Ok(ClosedPosition {
            position_id: position.position_id,
            assets: position.assets,
            rewards,
        })
    }
}

fn validate_assets(owner_id: &str, assets: &[Asset]) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(StakingError::validation("owner_id must not be empty"));
    }
    if assets.is_empty() {
        return Err(StakingError::validation("at least one asset is required"));
    }

    let mut seen = HashSet::new();
    for asset in assets {
        asset.validate()?;
        if asset.owner_id != owner_id {
            return Err(StakingError::validation(format!(
                "asset {} belongs to {}, not {}",
                asset.id, asset.owner_id, owner_id
            )));
        }
        if !seen.insert(asset.id.as_str()) {
            return Err(StakingError::validation(format!("duplicate asset id {}", asset.id)));
        }
    }
    Ok(())
}

fn ensure_event_strength(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StakingError::validation(format!(
            "{} must be a non-negative number, got {}",
            what, value
        )))
    }
}
