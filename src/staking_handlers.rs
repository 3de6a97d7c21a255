//! HTTP handlers for pools, positions, boosts and owner events

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::{
    error::Result,
    response::{responses, ApiResponse},
    staking::{Asset, ClosedPosition, Dimension, PoolStatistics, PoolType, StakingPosition},
    validation::ValidatedJson,
    AppState,
};

/// Asset as submitted when opening a position
#[derive(Debug, Deserialize, Validate)]
pub struct AssetPayload {
    #[validate(custom = "crate::validation::validators::validate_not_blank")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[validate(custom = "crate::validation::validators::validate_not_blank")]
    pub category: String,
    pub dimension: Dimension,
    #[validate(range(min = 0.0))]
    pub base_value: f64,
    /// Defaults to the position owner
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_replication_count")]
    #[validate(range(min = 1))]
    pub replication_count: u32,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub entanglement_degree: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub energy_score: f64,
    #[serde(default = "default_consciousness_tier")]
    #[validate(range(min = 1))]
    pub consciousness_tier: u32,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub anchor_strength: f64,
    #[serde(default = "default_time_factor")]
    #[validate(range(min = 1.0))]
    pub time_factor: f64,
}

fn default_replication_count() -> u32 { 1 }
fn default_consciousness_tier() -> u32 { 1 }
fn default_time_factor() -> f64 { 1.0 }

impl AssetPayload {
    fn into_asset(self, position_owner: &str) -> Asset {
        Asset {
            id: self.id,
            name: self.name,
            category: self.category,
            dimension: self.dimension,
            base_value: self.base_value,
            owner_id: self.owner_id.unwrap_or_else(|| position_owner.to_string()),
            replication_count: self.replication_count,
            entanglement_degree: self.entanglement_degree,
            energy_score: self.energy_score,
            consciousness_tier: self.consciousness_tier,
            anchor_strength: self.anchor_strength,
            time_factor: self.time_factor,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct OpenPositionRequest {
    #[validate(custom = "crate::validation::validators::validate_not_blank")]
    pub owner_id: String,
    pub pool_type: PoolType,
    #[validate(range(min = 1))]
    pub lock_days: u32,
    #[validate]
    pub assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EntanglementBoostRequest {
    #[validate(range(min = 0.0, max = 1.0))]
    pub delta: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConsciousnessBoostRequest {
    #[serde(default)]
    pub tier_delta: u32,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub energy_delta: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnchorBoostRequest {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub anchor_delta: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub time_delta: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MeditationRequest {
    #[validate(range(min = 0.0))]
    pub quality: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RealityDistortionRequest {
    #[validate(range(min = 0.0))]
    pub intention_strength: f64,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyCloseQuery {
    pub penalty_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RewardsResponse {
    pub position_id: String,
    pub claimable: f64,
    pub accrued: f64,
    pub days_staked: i64,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub position_id: String,
    pub claimed: f64,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub owner_id: String,
    pub positions: Vec<String>,
}

/// List every pool with its running totals
pub async fn list_pools(State(state): State<AppState>) -> ApiResponse<Vec<PoolStatistics>> {
    responses::ok(state.engine.pool_statistics().await)
}

/// Open a new staking position
pub async fn open_position(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<OpenPositionRequest>,
) -> Result<Response> {
    debug!(
        owner_id = %request.owner_id,
        pool = %request.pool_type,
        lock_days = request.lock_days,
        assets = request.assets.len(),
        "Open position requested"
    );

    let owner_id = request.owner_id;
    let assets = request
        .assets
        .into_iter()
        .map(|asset| asset.into_asset(&owner_id))
        .collect();

    let position = state
        .engine
        .open_position(&owner_id, assets, request.pool_type, request.lock_days)
        .await?;
    Ok(responses::created(position))
}

pub async fn get_position(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<ApiResponse<StakingPosition>> {
    Ok(responses::ok(state.engine.get_position(&position_id).await?))
}

pub async fn get_rewards(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<ApiResponse<RewardsResponse>> {
    let quote = state.engine.quote_rewards(&position_id).await?;
    Ok(responses::ok(RewardsResponse {
        position_id,
        claimable: quote.claimable,
        accrued: quote.accrued,
        days_staked: quote.days_staked,
    }))
}

pub async fn claim_rewards(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<ApiResponse<ClaimResponse>> {
    let claimed = state.engine.claim_rewards(&position_id).await?;
    Ok(responses::ok(ClaimResponse { position_id, claimed }))
}

/// Close after the lock period ends
pub async fn close_position(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<ApiResponse<ClosedPosition>> {
    Ok(responses::ok(state.engine.close_position(&position_id).await?))
}

/// Close before unlock, forfeiting `penalty_rate` of accrued rewards
pub async fn emergency_close(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
    Query(query): Query<EmergencyCloseQuery>,
) -> Result<ApiResponse<ClosedPosition>> {
    let closed = state
        .engine
        .emergency_close(&position_id, query.penalty_rate)
        .await?;
    Ok(responses::ok(closed))
}

pub async fn boost_entanglement(
    State(state): State<AppState>,
    Path((position_id, asset_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<EntanglementBoostRequest>,
) -> Result<ApiResponse<StakingPosition>> {
    let position = state
        .engine
        .boost_entanglement(&position_id, &asset_id, request.delta)
        .await?;
    Ok(responses::ok(position))
}

pub async fn boost_consciousness(
    State(state): State<AppState>,
    Path((position_id, asset_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<ConsciousnessBoostRequest>,
) -> Result<ApiResponse<StakingPosition>> {
    let position = state
        .engine
        .boost_consciousness(&position_id, &asset_id, request.tier_delta, request.energy_delta)
        .await?;
    Ok(responses::ok(position))
}

pub async fn boost_anchor(
    State(state): State<AppState>,
    Path((position_id, asset_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<AnchorBoostRequest>,
) -> Result<ApiResponse<StakingPosition>> {
    let position = state
        .engine
        .boost_anchor(&position_id, &asset_id, request.anchor_delta, request.time_delta)
        .await?;
    Ok(responses::ok(position))
}

pub async fn list_owner_positions(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<ApiResponse<Vec<StakingPosition>>> {
    Ok(responses::ok(state.engine.list_owner_positions(&owner_id).await?))
}

pub async fn quantum_entanglement_event(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<ApiResponse<EventResponse>> {
    let positions = state.engine.quantum_entanglement_event(&owner_id).await?;
    Ok(responses::ok(EventResponse { owner_id, positions }))
}

pub async fn meditation_boost(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    ValidatedJson(request): ValidatedJson<MeditationRequest>,
) -> Result<ApiResponse<EventResponse>> {
    let positions = state.engine.meditation_boost(&owner_id, request.quality).await?;
    Ok(responses::ok(EventResponse { owner_id, positions }))
}

pub async fn reality_distortion(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RealityDistortionRequest>,
) -> Result<ApiResponse<EventResponse>> {
    let positions = state
        .engine
        .reality_distortion(&owner_id, request.intention_strength)
        .await?;
    Ok(responses::ok(EventResponse { owner_id, positions }))
}
