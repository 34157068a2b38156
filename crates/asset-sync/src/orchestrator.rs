//! 스냅샷 동기화 오케스트레이터.
//!
//! 한 번의 실행 흐름:
//!
//! 1. 컬렉션 목록 로드
//! 2. 컬렉션마다 `fetch_all`을 동시에 실행 (모두 완료될 때까지 대기, 형제 작업 취소 없음)
//! 3. [`FailurePolicy`]에 따라 실패 처리
//! 4. 결과를 평탄화해서 스냅샷 전체 교체
//! 5. [`SyncReport`] 반환 및 요약 로그
//!
//! 교체 단계 이전에 실패하면 기존 스냅샷은 그대로 남습니다.

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use asset_sources::AdapterRegistry;

use crate::error::SyncError;
use crate::job::JobRunner;
use crate::stats::SyncReport;
use crate::store::{CollectionSource, SnapshotStore};
use crate::SyncResult;

/// 컬렉션 하나의 조회가 실패했을 때의 처리 방식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 실행 전체 중단, 기존 스냅샷 유지
    #[default]
    AbortRun,
    /// 해당 컬렉션만 새 스냅샷에서 제외하고 계속 진행
    SkipCollection,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortRun => write!(f, "abort"),
            Self::SkipCollection => write!(f, "skip"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::AbortRun),
            "skip" => Ok(Self::SkipCollection),
            other => Err(format!(
                "알 수 없는 SYNC_FAILURE_POLICY: {} (abort 또는 skip)",
                other
            )),
        }
    }
}

/// 스냅샷 동기화 오케스트레이터.
pub struct SyncOrchestrator {
    collections: Arc<dyn CollectionSource>,
    snapshot: Arc<dyn SnapshotStore>,
    sources: Arc<AdapterRegistry>,
    policy: FailurePolicy,
}

impl SyncOrchestrator {
    pub fn new(
        collections: Arc<dyn CollectionSource>,
        snapshot: Arc<dyn SnapshotStore>,
        sources: Arc<AdapterRegistry>,
    ) -> Self {
        Self {
            collections,
            snapshot,
            sources,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 전체 컬렉션을 조회해서 스냅샷을 교체합니다.
    pub async fn run_sync(&self) -> SyncResult<SyncReport> {
        let started = Instant::now();
        let collections = self.collections.list_collections().await?;

        tracing::info!(
            collections = collections.len(),
            policy = %self.policy,
            "에셋 동기화 시작"
        );

        let results = join_all(collections.iter().map(|collection| async move {
            let result = self.sources.fetch_all(collection).await;
            (collection, result)
        }))
        .await;

        let mut report = SyncReport::new();
        report.collections = collections.len();
        let mut assets = Vec::new();

        for (collection, result) in results {
            match result {
                Ok(fetched) => {
                    tracing::debug!(
                        collection = %collection.name,
                        kind = %collection.kind,
                        pagination = ?collection.kind.pagination(),
                        count = fetched.len(),
                        "컬렉션 조회 완료"
                    );
                    report.add_kind(collection.kind, fetched.len());
                    assets.extend(fetched);
                }
                Err(e) => match self.policy {
                    FailurePolicy::AbortRun => {
                        tracing::error!(
                            collection = %collection.name,
                            kind = %collection.kind,
                            pagination = ?collection.kind.pagination(),
                            error = %e,
                            "컬렉션 조회 실패, 동기화 중단 (기존 스냅샷 유지)"
                        );
                        return Err(SyncError::Source {
                            collection: collection.name.clone(),
                            source: e,
                        });
                    }
                    FailurePolicy::SkipCollection => {
                        tracing::warn!(
                            collection = %collection.name,
                            kind = %collection.kind,
                            error = %e,
                            "컬렉션 조회 실패, 이번 스냅샷에서 제외"
                        );
                        report.failed_collections += 1;
                    }
                },
            }
        }

        report.fetched = assets.len();

        let summary = self.snapshot.replace_all(&assets).await?;
        report.deleted = summary.deleted;
        report.inserted = summary.inserted;
        report.elapsed = started.elapsed();

        report.log_summary("에셋 스냅샷 교체");
        Ok(report)
    }
}

#[async_trait]
impl JobRunner for SyncOrchestrator {
    async fn run(&self) -> SyncResult<SyncReport> {
        self.run_sync().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("abort".parse::<FailurePolicy>(), Ok(FailurePolicy::AbortRun));
        assert_eq!(" Skip ".parse::<FailurePolicy>(), Ok(FailurePolicy::SkipCollection));
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::AbortRun);
        assert_eq!(FailurePolicy::SkipCollection.to_string(), "skip");
    }
}
