//! Immutable X 어댑터.
//!
//! 불투명 커서 페이지네이션. 빈 페이지가 오면 종료하고, 그 외에는 소스가 준
//! 커서를 형식/단조성 가정 없이 그대로 따라갑니다. rate limit이 넉넉해서
//! 페이지 사이 딜레이는 없습니다.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;

use asset_core::{first_non_empty, parse_timestamp_or_now, Collection, MarketplaceKind, NewAsset};

use crate::adapter::{FailedPages, PagePolicy, SourceAdapter};
use crate::http::{endpoint, JsonClient, PageResponse};
use crate::SourceResult;

const PAGE_SIZE: u32 = 200;

/// IMX 어댑터 설정.
#[derive(Debug, Clone)]
pub struct ImxConfig {
    /// API 기본 URL
    pub base_url: String,
    /// 실패한 페이지 재요청 전 대기 (기본: 1초)
    pub failure_delay: Duration,
    /// 연속 실패 허용 횟수 (`None`이면 무제한)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for ImxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.x.immutable.com".to_string(),
            failure_delay: Duration::from_secs(1),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImxPage {
    #[serde(default)]
    result: Vec<serde_json::Value>,
    #[serde(default)]
    cursor: String,
}

#[derive(Debug, Deserialize)]
struct ImxAsset {
    token_id: String,
    token_address: Option<String>,
    user: Option<String>,
    name: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

/// IMX 어댑터.
#[derive(Debug, Clone)]
pub struct ImxAdapter {
    client: JsonClient,
    config: ImxConfig,
}

impl ImxAdapter {
    pub fn new(client: JsonClient, config: ImxConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SourceAdapter for ImxAdapter {
    fn kind(&self) -> MarketplaceKind {
        MarketplaceKind::Imx
    }

    async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>> {
        let address = collection.require_address()?;

        let mut base = endpoint(&self.config.base_url, "/v1/assets")?;
        base.query_pairs_mut()
            .append_pair("collection", address)
            .append_pair("page_size", &PAGE_SIZE.to_string());

        let policy = PagePolicy::unbounded(self.config.failure_delay)
            .with_max_failures(self.config.max_consecutive_failures);
        let mut failed = FailedPages::new(self.kind(), policy);
        let mut assets = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut url = base.clone();
            url.query_pairs_mut().append_pair("cursor", &cursor);

            tracing::debug!(collection = %collection.name, cursor = %cursor, "IMX 페이지 요청");

            match self.client.get_page::<ImxPage>(&url, HeaderMap::new()).await? {
                PageResponse::Success(page) => {
                    failed.reset();

                    if page.result.is_empty() {
                        break;
                    }

                    tracing::debug!(count = page.result.len(), "IMX 페이지 수신");
                    assets.extend(
                        page.result
                            .into_iter()
                            .filter_map(|raw| map_item(raw, collection, address)),
                    );
                    cursor = page.cursor;
                }
                PageResponse::Failed(status) => failed.record(status).await?,
            }
        }

        tracing::info!(
            collection = %collection.name,
            count = assets.len(),
            failed_pages = failed.total(),
            "IMX 조회 완료"
        );

        Ok(assets)
    }
}

fn map_item(raw: serde_json::Value, collection: &Collection, address: &str) -> Option<NewAsset> {
    match serde_json::from_value::<ImxAsset>(raw) {
        Ok(asset) => Some(normalize(asset, collection, address)),
        Err(e) => {
            tracing::warn!(collection = %collection.name, error = %e, "IMX 아이템 매핑 실패");
            None
        }
    }
}

fn normalize(asset: ImxAsset, collection: &Collection, address: &str) -> NewAsset {
    NewAsset {
        url: format!(
            "https://market.immutable.com/collections/{}/assets/{}",
            address, asset.token_id
        ),
        image: first_non_empty([asset.image_url.as_deref()]),
        address: asset.token_address.unwrap_or_default(),
        name: asset.name.unwrap_or_default(),
        description: asset.description.unwrap_or_default(),
        owner: asset.user.unwrap_or_default(),
        meta: asset.metadata.unwrap_or(serde_json::Value::Null),
        collection_id: collection.id,
        created_at: parse_timestamp_or_now(asset.created_at.as_deref()),
        updated_at: parse_timestamp_or_now(asset.updated_at.as_deref()),
        iid: asset.token_id,
    }
}
