//! 영속성 포트.
//!
//! 오케스트레이터와 작업 가드는 아래 trait만 의존합니다.
//! 운영 환경은 [`postgres`], 테스트와 dry-run은 [`memory`] 구현을 사용합니다.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use asset_core::{Asset, Collection, NewAsset};

pub use memory::{MemoryCollectionSource, MemoryJobStore, MemorySnapshotStore};
pub use postgres::{migrate, PgCollectionSource, PgJobStore, PgSnapshotStore};

/// 저장소 Result 타입 별칭
pub type StoreResult<T> = Result<T, sqlx::Error>;

/// 동기화 대상 컬렉션 목록 (읽기 전용).
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn list_collections(&self) -> StoreResult<Vec<Collection>>;
}

/// 스냅샷 교체 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub deleted: u64,
    pub inserted: u64,
}

/// 에셋 스냅샷 저장소.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 모든 에셋 삭제, 삭제된 행 수 반환
    async fn delete_all(&self) -> StoreResult<u64>;

    /// 에셋 일괄 삽입, 삽입된 행 수 반환
    async fn insert_many(&self, assets: &[NewAsset]) -> StoreResult<u64>;

    /// 스냅샷 전체 교체.
    ///
    /// 기본 구현은 삭제 후 삽입이며 두 단계 사이에 빈 스냅샷이 보일 수 있습니다.
    /// 원자적 교체가 가능한 저장소는 재정의합니다.
    async fn replace_all(&self, assets: &[NewAsset]) -> StoreResult<ReplaceSummary> {
        let deleted = self.delete_all().await?;
        let inserted = self.insert_many(assets).await?;
        Ok(ReplaceSummary { deleted, inserted })
    }

    async fn count(&self) -> StoreResult<u64>;

    async fn list(&self) -> StoreResult<Vec<Asset>>;
}

/// 마지막 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// 영속화된 작업 상태.
///
/// `disabled`가 true인 동안 다른 실행은 시작되지 않습니다.
/// 실행 중 프로세스가 죽으면 재활성화 전까지(또는 잠금 만료 전까지) 유지됩니다.
/// `paused`는 운영자가 건 수동 정지로, 실행 잠금과 별개로 유지됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub name: String,
    pub schedule: String,
    pub disabled: bool,
    pub paused: bool,
    /// 현재 잠금 획득 시각 (실행 중이 아니면 `None`)
    pub locked_at: Option<DateTime<Utc>>,
    /// 현재 잠금을 가진 실행의 토큰
    pub lock_owner: Option<Uuid>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_status: Option<JobStatus>,
    pub last_error: Option<String>,
    pub run_count: i64,
}

impl JobState {
    pub fn new(name: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            disabled: false,
            paused: false,
            locked_at: None,
            lock_owner: None,
            last_run_at: None,
            last_finished_at: None,
            last_status: None,
            last_error: None,
            run_count: 0,
        }
    }

    /// 잠금 획득 가능 여부.
    ///
    /// 수동 정지 상태가 아니고, 활성 상태이거나 잠금 만료가 설정된 경우
    /// `locked_at`이 만료 시간보다 오래됐을 때만 true.
    pub fn acquirable(&self, lock_timeout: Option<Duration>, now: DateTime<Utc>) -> bool {
        if self.paused {
            return false;
        }
        if !self.disabled {
            return true;
        }
        match (lock_timeout, self.locked_at) {
            (Some(timeout), Some(locked_at)) => match chrono::Duration::from_std(timeout) {
                Ok(timeout) => locked_at + timeout < now,
                Err(_) => false,
            },
            _ => false,
        }
    }
}

/// 작업 상태 저장소 (작업 이름 기준).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// 작업 레코드 생성. 이미 있으면 스케줄만 갱신하고 실행 상태는 유지
    async fn ensure(&self, name: &str, schedule: &str) -> StoreResult<()>;

    async fn find(&self, name: &str) -> StoreResult<Option<JobState>>;

    /// 원자적 잠금 획득 (compare-and-set).
    ///
    /// 성공 시 작업은 비활성화 상태가 되고 이번 실행의 소유 토큰을 반환합니다.
    async fn try_acquire(
        &self,
        name: &str,
        lock_timeout: Option<Duration>,
    ) -> StoreResult<Option<Uuid>>;

    /// 잠금 해제 (재활성화 + 결과 기록).
    ///
    /// `owner`가 현재 잠금 소유자일 때만 적용되며 적용 여부를 반환합니다.
    /// 만료된 잠금을 다른 실행이 가져간 뒤에는 이전 실행의 해제가 무시됩니다.
    async fn release(
        &self,
        name: &str,
        owner: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<bool>;

    /// 수동 정지/해제. 실행 잠금은 건드리지 않으며 실행이 끝나도 정지는 유지됨
    async fn set_paused(&self, name: &str, paused: bool) -> StoreResult<bool>;

    /// 재활성화: 수동 정지와 크래시로 남은 잠금을 모두 해제
    async fn rearm(&self, name: &str) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquirable_without_timeout_stays_closed() {
        let now = Utc::now();
        let mut state = JobState::new("assets:fetch", "0 0 0 * * *");
        assert!(state.acquirable(None, now));

        state.disabled = true;
        state.locked_at = Some(now - chrono::Duration::days(3));
        assert!(!state.acquirable(None, now));
    }

    #[test]
    fn test_acquirable_after_lock_timeout() {
        let now = Utc::now();
        let mut state = JobState::new("assets:fetch", "0 0 0 * * *");
        state.disabled = true;
        state.locked_at = Some(now - chrono::Duration::minutes(10));

        assert!(!state.acquirable(Some(Duration::from_secs(60 * 30)), now));
        assert!(state.acquirable(Some(Duration::from_secs(60 * 5)), now));
    }

    #[test]
    fn test_paused_job_never_expires() {
        let now = Utc::now();
        let mut state = JobState::new("assets:fetch", "0 0 0 * * *");
        state.paused = true;
        assert!(!state.acquirable(Some(Duration::from_secs(1)), now));

        // 정지 중에는 오래된 잠금도 가져갈 수 없음
        state.disabled = true;
        state.locked_at = Some(now - chrono::Duration::days(1));
        assert!(!state.acquirable(Some(Duration::from_secs(1)), now));
    }

    #[test]
    fn test_job_status_roundtrip_str() {
        assert_eq!(JobStatus::parse(JobStatus::Success.as_str()), Some(JobStatus::Success));
        assert_eq!(JobStatus::parse("failure"), Some(JobStatus::Failure));
        assert_eq!(JobStatus::parse("running"), None);
    }
}
