//! Position storage
//!
//! The engine only talks to [`PositionStore`], so the in-memory map can be
//! swapped for a database table without touching the reward logic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::Result;
use super::types::StakingPosition;

#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Fetch a position by id
    async fn get(&self, position_id: &str) -> Result<Option<StakingPosition>>;

    /// Insert or replace a position
    async fn put(&self, position: StakingPosition) -> Result<()>;

    /// Every stored position, open or closed
    async fn list(&self) -> Result<Vec<StakingPosition>>;

    /// Positions belonging to one owner, oldest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StakingPosition>> {
        let mut positions: Vec<StakingPosition> = self
            .list()
            .await?
            .into_iter()
            .filter(|position| position.owner_id == owner_id)
            .collect();
        positions.sort_by(|a, b| {
            a.stake_time
                .cmp(&b.stake_time)
                .then_with(|| a.position_id.cmp(&b.position_id))
        });
        Ok(positions)
    }
}

/// Process-local position store
#[derive(Default)]
pub struct InMemoryPositionStore {
    positions: Arc<RwLock<HashMap<String, StakingPosition>>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn get(&self, position_id: &str) -> Result<Option<StakingPosition>> {
        Ok(self.positions.read().await.get(position_id).cloned())
    }

    async fn put(&self, position: StakingPosition) -> Result<()> {
        self.positions
            .write()
            .await
            .insert(position.position_id.clone(), position);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StakingPosition>> {
        Ok(self.positions.read().await.values().cloned().collect())
    }
}
