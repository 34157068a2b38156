//! 인메모리 저장소 (테스트, dry-run 용).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use asset_core::{Asset, Collection, NewAsset};

use super::{
    CollectionSource, JobState, JobStatus, JobStore, ReplaceSummary, SnapshotStore, StoreResult,
};

/// 고정된 컬렉션 목록.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollectionSource {
    collections: Arc<RwLock<Vec<Collection>>>,
}

impl MemoryCollectionSource {
    pub fn new(collections: Vec<Collection>) -> Self {
        Self {
            collections: Arc::new(RwLock::new(collections)),
        }
    }
}

#[async_trait]
impl CollectionSource for MemoryCollectionSource {
    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        Ok(self.collections.read().await.clone())
    }
}

/// 인메모리 스냅샷.
///
/// 쓰기 락 하나로 교체하므로 읽는 쪽은 항상 이전 또는 새 스냅샷 전체를 봅니다.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    assets: Arc<RwLock<Vec<Asset>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 스냅샷으로 초기화
    pub fn with_assets(assets: Vec<NewAsset>) -> Self {
        Self {
            assets: Arc::new(RwLock::new(
                assets.into_iter().map(Asset::from_new).collect(),
            )),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn delete_all(&self) -> StoreResult<u64> {
        let mut assets = self.assets.write().await;
        let deleted = assets.len() as u64;
        assets.clear();
        Ok(deleted)
    }

    async fn insert_many(&self, assets: &[NewAsset]) -> StoreResult<u64> {
        let mut current = self.assets.write().await;
        current.extend(assets.iter().cloned().map(Asset::from_new));
        Ok(assets.len() as u64)
    }

    async fn replace_all(&self, assets: &[NewAsset]) -> StoreResult<ReplaceSummary> {
        let fresh: Vec<Asset> = assets.iter().cloned().map(Asset::from_new).collect();

        let mut current = self.assets.write().await;
        let deleted = current.len() as u64;
        *current = fresh;

        Ok(ReplaceSummary {
            deleted,
            inserted: current.len() as u64,
        })
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.assets.read().await.len() as u64)
    }

    async fn list(&self) -> StoreResult<Vec<Asset>> {
        Ok(self.assets.read().await.clone())
    }
}

/// 인메모리 작업 상태 저장소.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, JobState>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 크래시로 잠금이 남은 상태 재현용
    pub async fn insert_state(&self, state: JobState) {
        self.jobs.write().await.insert(state.name.clone(), state);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn ensure(&self, name: &str, schedule: &str) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(name.to_string())
            .and_modify(|state| state.schedule = schedule.to_string())
            .or_insert_with(|| JobState::new(name, schedule));
        Ok(())
    }

    async fn find(&self, name: &str) -> StoreResult<Option<JobState>> {
        Ok(self.jobs.read().await.get(name).cloned())
    }

    async fn try_acquire(
        &self,
        name: &str,
        lock_timeout: Option<Duration>,
    ) -> StoreResult<Option<Uuid>> {
        let mut jobs = self.jobs.write().await;
        let Some(state) = jobs.get_mut(name) else {
            return Ok(None);
        };

        let now = Utc::now();
        if !state.acquirable(lock_timeout, now) {
            return Ok(None);
        }

        let owner = Uuid::new_v4();
        state.disabled = true;
        state.locked_at = Some(now);
        state.lock_owner = Some(owner);
        state.last_run_at = Some(now);
        state.run_count += 1;
        Ok(Some(owner))
    }

    async fn release(
        &self,
        name: &str,
        owner: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().await;
        let Some(state) = jobs.get_mut(name) else {
            return Ok(false);
        };
        if state.lock_owner != Some(owner) {
            return Ok(false);
        }

        state.disabled = false;
        state.locked_at = None;
        state.lock_owner = None;
        state.last_finished_at = Some(Utc::now());
        state.last_status = Some(status);
        state.last_error = error.map(str::to_string);
        Ok(true)
    }

    async fn set_paused(&self, name: &str, paused: bool) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().await;
        let Some(state) = jobs.get_mut(name) else {
            return Ok(false);
        };

        state.paused = paused;
        Ok(true)
    }

    async fn rearm(&self, name: &str) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().await;
        let Some(state) = jobs.get_mut(name) else {
            return Ok(false);
        };

        state.paused = false;
        state.disabled = false;
        state.locked_at = None;
        state.lock_owner = None;
        Ok(true)
    }
}
