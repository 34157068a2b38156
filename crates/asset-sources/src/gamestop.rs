//! GameStop NFT 마켓플레이스 어댑터.
//!
//! offset/limit 페이지네이션 (전체 개수 `totalNum` 제공).
//! 비공식 rate limit이 있어 응답과 무관하게 요청 사이에 고정 딜레이를 둡니다.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;

use asset_core::{first_non_empty, parse_timestamp_or_now, Collection, MarketplaceKind, NewAsset};

use crate::adapter::{pause, FailedPages, PagePolicy, SourceAdapter};
use crate::http::{endpoint, JsonClient, PageResponse};
use crate::SourceResult;

const PAGE_SIZE: u64 = 100;
const DEFAULT_LAYER: &str = "Immutable";
const STATIC_HOST: &str = "https://static.gstop-content.com";
const IPFS_GATEWAY: &str = "https://www.gstop-content.com/ipfs/";

/// GameStop 어댑터 설정.
#[derive(Debug, Clone)]
pub struct GameStopConfig {
    /// API 기본 URL
    pub base_url: String,
    /// 요청 간 고정 딜레이 (기본: 600ms)
    pub page_delay: Duration,
    /// 연속 실패 허용 횟수 (`None`이면 무제한)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for GameStopConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nft.gamestop.com".to_string(),
            page_delay: Duration::from_millis(600),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GsPage {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    offset: u64,
    limit: u64,
    total_num: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GsNft {
    token_id: String,
    contract_address: Option<String>,
    name: Option<String>,
    description: Option<String>,
    metadata_json: Option<serde_json::Value>,
    media_uri: Option<String>,
    media_thumbnail_uri: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

/// GameStop 어댑터.
#[derive(Debug, Clone)]
pub struct GameStopAdapter {
    client: JsonClient,
    config: GameStopConfig,
}

impl GameStopAdapter {
    pub fn new(client: JsonClient, config: GameStopConfig) -> Self {
        Self { client, config }
    }

    fn policy(&self) -> PagePolicy {
        PagePolicy::unbounded(self.config.page_delay)
            .with_max_failures(self.config.max_consecutive_failures)
    }
}

#[async_trait]
impl SourceAdapter for GameStopAdapter {
    fn kind(&self) -> MarketplaceKind {
        MarketplaceKind::GameStop
    }

    async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>> {
        let external_id = collection.require_external_id()?;
        let permalink_address = collection.require_address()?;
        let layer = collection.meta_str("layer").unwrap_or(DEFAULT_LAYER);

        let mut base = endpoint(&self.config.base_url, "/nft-svc-marketplace/getNftsPaginated")?;
        base.query_pairs_mut()
            .append_pair("collectionId", external_id)
            .append_pair("limit", &PAGE_SIZE.to_string())
            .append_pair("sortBy", "price")
            .append_pair("sortOrder", "asc")
            .append_pair("nativeLayer", layer);

        let mut failed = FailedPages::new(self.kind(), self.policy());
        let mut assets = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("offset", &offset.to_string());

            tracing::debug!(collection = %collection.name, offset, "GameStop 페이지 요청");

            match self.client.get_page::<GsPage>(&url, HeaderMap::new()).await? {
                PageResponse::Success(page) => {
                    failed.reset();

                    if page.data.is_empty() {
                        break;
                    }

                    tracing::debug!(count = page.data.len(), "GameStop 페이지 수신");
                    assets.extend(
                        page.data
                            .into_iter()
                            .filter_map(|raw| map_item(raw, collection, permalink_address)),
                    );

                    // limit 0은 더 진행할 수 없으므로 소진으로 처리
                    let next_offset = page.offset.saturating_add(page.limit);
                    if page.limit == 0 || next_offset >= page.total_num {
                        break;
                    }
                    offset = next_offset;

                    pause(self.config.page_delay).await;
                }
                PageResponse::Failed(status) => failed.record(status).await?,
            }
        }

        tracing::info!(
            collection = %collection.name,
            count = assets.len(),
            failed_pages = failed.total(),
            "GameStop 조회 완료"
        );

        Ok(assets)
    }
}

fn map_item(raw: serde_json::Value, collection: &Collection, address: &str) -> Option<NewAsset> {
    match serde_json::from_value::<GsNft>(raw) {
        Ok(nft) => Some(normalize(nft, collection, address)),
        Err(e) => {
            tracing::warn!(collection = %collection.name, error = %e, "GameStop 아이템 매핑 실패");
            None
        }
    }
}

fn normalize(nft: GsNft, collection: &Collection, address: &str) -> NewAsset {
    let image = first_non_empty([
        nft.media_thumbnail_uri.as_deref(),
        nft.media_uri.as_deref(),
    ]);

    NewAsset {
        url: format!("https://nft.gamestop.com/token/{}/{}", address, nft.token_id),
        image: public_link(&image),
        address: nft.contract_address.unwrap_or_default(),
        name: nft.name.unwrap_or_default(),
        description: nft.description.unwrap_or_default(),
        owner: String::new(),
        meta: nft.metadata_json.unwrap_or(serde_json::Value::Null),
        collection_id: collection.id,
        created_at: parse_timestamp_or_now(nft.created_at.as_deref()),
        updated_at: parse_timestamp_or_now(nft.updated_at.as_deref()),
        iid: nft.token_id,
    }
}

/// GameStop 내부 경로를 공개 URL로 변환.
///
/// - `public/…` → `https://static.gstop-content.com/…`
/// - `ipfs://…` → `https://www.gstop-content.com/ipfs/…`
pub fn public_link(link: &str) -> String {
    if let Some(rest) = link.strip_prefix("public") {
        if rest.starts_with('/') {
            return format!("{}{}", STATIC_HOST, rest);
        }
    }
    if let Some(rest) = link.strip_prefix("ipfs://") {
        return format!("{}{}", IPFS_GATEWAY, rest);
    }
    link.to_string()
}
