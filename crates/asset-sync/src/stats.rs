//! 동기화 실행 통계.

use std::collections::BTreeMap;
use std::time::Duration;

use asset_core::MarketplaceKind;
use serde::{Deserialize, Serialize};

/// 한 번의 스냅샷 교체 실행 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// 조회 대상 컬렉션 수
    pub collections: usize,
    /// 실패로 건너뛴 컬렉션 수 (`SkipCollection` 정책에서만 0 초과)
    pub failed_collections: usize,
    /// 소스에서 받은 에셋 수
    pub fetched: usize,
    /// 교체 전 스냅샷에서 삭제된 행 수
    pub deleted: u64,
    /// 새로 기록된 행 수
    pub inserted: u64,
    /// 마켓플레이스별 에셋 수
    pub per_kind: BTreeMap<MarketplaceKind, usize>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 컬렉션 성공률 (%)
    pub fn success_rate(&self) -> f64 {
        if self.collections == 0 {
            0.0
        } else {
            let ok = self.collections - self.failed_collections;
            (ok as f64 / self.collections as f64) * 100.0
        }
    }

    /// 마켓플레이스별 에셋 수 누적
    pub fn add_kind(&mut self, kind: MarketplaceKind, count: usize) {
        *self.per_kind.entry(kind).or_default() += count;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        let per_kind = self
            .per_kind
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(
            operation = operation,
            collections = self.collections,
            failed_collections = self.failed_collections,
            fetched = self.fetched,
            deleted = self.deleted,
            inserted = self.inserted,
            per_kind = %per_kind,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}
