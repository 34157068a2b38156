//! 소스 어댑터 trait 및 마켓플레이스별 디스패치.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use asset_core::{Collection, MarketplaceKind, NewAsset};

use crate::{SourceError, SourceResult};

/// 마켓플레이스 하나의 전체 에셋을 가져오는 어댑터.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// 담당 마켓플레이스 종류.
    fn kind(&self) -> MarketplaceKind;

    /// 컬렉션의 현재 에셋 전체를 조회합니다.
    ///
    /// 모든 페이지를 순서대로 훑거나 소스가 소진을 알릴 때까지 반환하지 않습니다.
    /// 비성공 페이지는 버리고 같은 위치를 다시 요청합니다.
    async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>>;
}

/// 실패한 페이지 처리 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    /// 실패한 페이지를 다시 요청하기 전 대기 시간
    pub failure_delay: Duration,
    /// 연속 실패 허용 횟수 (`None`이면 무제한)
    pub max_consecutive_failures: Option<u32>,
}

impl PagePolicy {
    /// 무제한 재요청 정책.
    pub fn unbounded(failure_delay: Duration) -> Self {
        Self {
            failure_delay,
            max_consecutive_failures: None,
        }
    }

    /// 연속 실패 허용 횟수 설정.
    pub fn with_max_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_failures = max;
        self
    }
}

/// 한 번의 `fetch_all` 동안 연속 실패 페이지 수를 추적.
#[derive(Debug)]
pub(crate) struct FailedPages {
    kind: MarketplaceKind,
    policy: PagePolicy,
    consecutive: u32,
    total: u32,
}

impl FailedPages {
    pub(crate) fn new(kind: MarketplaceKind, policy: PagePolicy) -> Self {
        Self {
            kind,
            policy,
            consecutive: 0,
            total: 0,
        }
    }

    /// 실패 기록 후 재요청 전까지 대기. 허용 횟수를 넘으면 에러.
    pub(crate) async fn record(&mut self, status: StatusCode) -> SourceResult<()> {
        self.consecutive += 1;
        self.total += 1;

        tracing::warn!(
            marketplace = %self.kind,
            status = status.as_u16(),
            consecutive = self.consecutive,
            "페이지 요청 실패, 건너뜀"
        );

        if let Some(max) = self.policy.max_consecutive_failures {
            if self.consecutive > max {
                return Err(SourceError::TooManyFailedPages {
                    kind: self.kind,
                    failures: self.consecutive,
                });
            }
        }

        pause(self.policy.failure_delay).await;
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub(crate) fn total(&self) -> u32 {
        self.total
    }
}

/// 0이 아닌 경우에만 대기.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// 마켓플레이스 종류 → 어댑터 매핑.
///
/// 새 마켓플레이스는 `MarketplaceKind` variant 하나와 어댑터 등록 하나로 추가됩니다.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<MarketplaceKind, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// 빈 레지스트리 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 어댑터 등록. 같은 종류가 이미 있으면 교체합니다.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// 어댑터 조회.
    pub fn get(&self, kind: MarketplaceKind) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// 등록된 마켓플레이스 종류.
    pub fn kinds(&self) -> Vec<MarketplaceKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// 컬렉션 종류에 맞는 어댑터로 전체 에셋 조회.
    pub async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>> {
        let adapter = self
            .get(collection.kind)
            .ok_or(SourceError::NoAdapter(collection.kind))?;
        adapter.fetch_all(collection).await
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
