//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use asset_core::{Collection, MarketplaceKind, NewAsset};
use asset_sources::{AdapterRegistry, SourceAdapter, SourceError, SourceResult};
use asset_sync::store::{MemoryCollectionSource, MemorySnapshotStore};
use asset_sync::{JobRunner, SyncOrchestrator, SyncReport, SyncResult};

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// 컬렉션마다 고정된 개수의 에셋을 돌려주는 어댑터
pub struct FakeAdapter {
    kind: MarketplaceKind,
    per_collection: usize,
    failing: HashSet<Uuid>,
    pub calls: AtomicUsize,
}

/// 세 마켓플레이스 모두 정상 응답
pub fn all_adapters(per_collection: usize) -> Vec<Arc<FakeAdapter>> {
    MarketplaceKind::all()
        .into_iter()
        .map(|kind| Arc::new(FakeAdapter::new(kind, per_collection)))
        .collect()
}

impl FakeAdapter {
    pub fn new(kind: MarketplaceKind, per_collection: usize) -> Self {
        Self {
            kind,
            per_collection,
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, collection: &Collection) -> Self {
        self.failing.insert(collection.id);
        self
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn kind(&self) -> MarketplaceKind {
        self.kind
    }

    async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&collection.id) {
            return Err(SourceError::Decode {
                url: "http://fake/page".to_string(),
                message: "unexpected end of input".to_string(),
            });
        }

        Ok((0..self.per_collection)
            .map(|i| NewAsset {
                iid: format!("{}-{}", collection.name, i),
                collection_id: collection.id,
                name: format!("{} #{}", collection.name, i),
                description: String::new(),
                image: String::new(),
                address: "0xabc".to_string(),
                owner: String::new(),
                meta: serde_json::Value::Null,
                url: format!("https://market/{}/{}", collection.name, i),
                created_at: fixed_time(),
                updated_at: fixed_time(),
            })
            .collect())
    }
}

pub struct Fixture {
    pub collections: Vec<Collection>,
    pub source: Arc<MemoryCollectionSource>,
    pub snapshot: Arc<MemorySnapshotStore>,
}

/// 마켓플레이스별 컬렉션 하나씩
pub fn fixture() -> Fixture {
    let collections = vec![
        Collection::new("gs", MarketplaceKind::GameStop)
            .with_address("0xgs")
            .with_external_id("gs-1"),
        Collection::new("imx", MarketplaceKind::Imx).with_address("0ximx"),
        Collection::new("os", MarketplaceKind::OpenSea)
            .with_address("0xos")
            .with_slug("os"),
    ];

    Fixture {
        source: Arc::new(MemoryCollectionSource::new(collections.clone())),
        snapshot: Arc::new(MemorySnapshotStore::new()),
        collections,
    }
}

pub fn registry(adapters: Vec<Arc<FakeAdapter>>) -> Arc<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    Arc::new(registry)
}

pub fn orchestrator(fixture: &Fixture, adapters: Vec<Arc<FakeAdapter>>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        fixture.source.clone(),
        fixture.snapshot.clone(),
        registry(adapters),
    )
}

/// `release()` 호출 전까지 끝나지 않는 작업
#[derive(Default)]
pub struct BlockingRunner {
    pub started: Notify,
    release: Notify,
    pub runs: AtomicUsize,
}

impl BlockingRunner {
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl JobRunner for BlockingRunner {
    async fn run(&self) -> SyncResult<SyncReport> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(SyncReport::new())
    }
}

/// 즉시 끝나는 작업
#[derive(Default)]
pub struct CountingRunner {
    pub runs: AtomicUsize,
}

#[async_trait]
impl JobRunner for CountingRunner {
    async fn run(&self) -> SyncResult<SyncReport> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(SyncReport::new())
    }
}
