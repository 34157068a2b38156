//! OpenSea 어댑터.
//!
//! API 키가 필요한 커서 페이지네이션. 응답의 `next` 토큰이 비면 종료합니다.
//! 요청 제한이 엄격하므로 요청 사이 딜레이를 설정으로 조절합니다.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use asset_core::{first_non_empty, parse_timestamp_or_now, Collection, MarketplaceKind, NewAsset};

use crate::adapter::{pause, FailedPages, PagePolicy, SourceAdapter};
use crate::http::{endpoint, JsonClient, PageResponse};
use crate::{SourceError, SourceResult};

const PAGE_SIZE: u32 = 50;
const API_KEY_HEADER: &str = "x-api-key";

/// OpenSea 어댑터 설정.
#[derive(Debug, Clone)]
pub struct OpenSeaConfig {
    /// API 기본 URL
    pub base_url: String,
    /// API 키
    pub api_key: SecretString,
    /// 요청 간 딜레이 (기본: 300ms)
    pub page_delay: Duration,
    /// 연속 실패 허용 횟수 (`None`이면 무제한)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for OpenSeaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.opensea.io".to_string(),
            api_key: SecretString::from(String::new()),
            page_delay: Duration::from_millis(300),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenSeaPage {
    #[serde(default)]
    nfts: Vec<serde_json::Value>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenSeaNft {
    identifier: String,
    contract: Option<String>,
    token_standard: Option<String>,
    name: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    metadata_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    is_disabled: bool,
    #[serde(default)]
    is_nsfw: bool,
}

/// OpenSea 어댑터.
#[derive(Debug, Clone)]
pub struct OpenSeaAdapter {
    client: JsonClient,
    config: OpenSeaConfig,
}

impl OpenSeaAdapter {
    pub fn new(client: JsonClient, config: OpenSeaConfig) -> Self {
        Self { client, config }
    }

    fn headers(&self) -> SourceResult<HeaderMap> {
        let mut value = HeaderValue::from_str(self.config.api_key.expose_secret())
            .map_err(|_| SourceError::InvalidApiKey(MarketplaceKind::OpenSea))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, value);
        Ok(headers)
    }
}

#[async_trait]
impl SourceAdapter for OpenSeaAdapter {
    fn kind(&self) -> MarketplaceKind {
        MarketplaceKind::OpenSea
    }

    async fn fetch_all(&self, collection: &Collection) -> SourceResult<Vec<NewAsset>> {
        let slug = collection.require_slug()?;
        let address = collection.require_address()?;
        let headers = self.headers()?;

        let mut base = endpoint(
            &self.config.base_url,
            &format!("/v2/collection/{}/nfts", slug),
        )?;
        base.query_pairs_mut()
            .append_pair("limit", &PAGE_SIZE.to_string());

        let policy = PagePolicy::unbounded(self.config.page_delay)
            .with_max_failures(self.config.max_consecutive_failures);
        let mut failed = FailedPages::new(self.kind(), policy);
        let mut assets = Vec::new();
        let mut next = String::new();

        loop {
            let mut url = base.clone();
            url.query_pairs_mut().append_pair("next", &next);

            tracing::debug!(collection = %collection.name, next = %next, "OpenSea 페이지 요청");

            match self
                .client
                .get_page::<OpenSeaPage>(&url, headers.clone())
                .await?
            {
                PageResponse::Success(page) => {
                    failed.reset();

                    tracing::debug!(count = page.nfts.len(), "OpenSea 페이지 수신");
                    assets.extend(
                        page.nfts
                            .into_iter()
                            .filter_map(|raw| map_item(raw, collection, address)),
                    );

                    match page.next.filter(|n| !n.is_empty()) {
                        Some(token) => next = token,
                        None => break,
                    }

                    pause(self.config.page_delay).await;
                }
                PageResponse::Failed(status) => failed.record(status).await?,
            }
        }

        tracing::info!(
            collection = %collection.name,
            count = assets.len(),
            failed_pages = failed.total(),
            "OpenSea 조회 완료"
        );

        Ok(assets)
    }
}

fn map_item(raw: serde_json::Value, collection: &Collection, address: &str) -> Option<NewAsset> {
    match serde_json::from_value::<OpenSeaNft>(raw) {
        Ok(nft) => Some(normalize(nft, collection, address)),
        Err(e) => {
            tracing::warn!(collection = %collection.name, error = %e, "OpenSea 아이템 매핑 실패");
            None
        }
    }
}

fn normalize(nft: OpenSeaNft, collection: &Collection, address: &str) -> NewAsset {
    NewAsset {
        url: format!(
            "https://opensea.io/assets/ethereum/{}/{}",
            address, nft.identifier
        ),
        image: first_non_empty([nft.image_url.as_deref()]),
        meta: json!({
            "token_standard": nft.token_standard,
            "metadata_url": nft.metadata_url,
            "is_disabled": nft.is_disabled,
            "is_nsfw": nft.is_nsfw,
        }),
        address: nft.contract.unwrap_or_default(),
        name: nft.name.unwrap_or_default(),
        description: nft.description.unwrap_or_default(),
        owner: String::new(),
        collection_id: collection.id,
        created_at: parse_timestamp_or_now(nft.created_at.as_deref()),
        updated_at: parse_timestamp_or_now(nft.updated_at.as_deref()),
        iid: nft.identifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_opensea_nft() {
        let col = Collection::new("The Bridged", MarketplaceKind::OpenSea)
            .with_address("0xBf7dB7c4e9C7bcef25859a7411eB98e7F7Cf228E")
            .with_slug("the-bridged");
        let nft: OpenSeaNft = serde_json::from_value(json!({
            "identifier": "99",
            "collection": "the-bridged",
            "contract": "0xbf7db7c4e9c7bcef25859a7411eb98e7f7cf228e",
            "token_standard": "erc721",
            "name": "Bridged #99",
            "description": "",
            "image_url": "",
            "metadata_url": "https://meta/99",
            "created_at": "",
            "updated_at": "2023-09-01T00:00:00.000000",
            "is_disabled": false,
            "is_nsfw": false
        }))
        .unwrap();

        let asset = normalize(nft, &col, "0xBf7dB7c4e9C7bcef25859a7411eB98e7F7Cf228E");

        assert_eq!(asset.image, "");
        assert_eq!(asset.owner, "");
        assert_eq!(asset.meta["token_standard"], "erc721");
        assert_eq!(asset.meta["is_nsfw"], false);
        assert_eq!(
            asset.url,
            "https://opensea.io/assets/ethereum/0xBf7dB7c4e9C7bcef25859a7411eB98e7F7Cf228E/99"
        );
        assert_eq!(asset.updated_at.to_rfc3339(), "2023-09-01T00:00:00+00:00");
    }

    #[test]
    fn test_headers_carry_api_key() {
        let client = JsonClient::new(Duration::from_secs(5)).unwrap();
        let adapter = OpenSeaAdapter::new(
            client,
            OpenSeaConfig {
                api_key: SecretString::from("key-123".to_string()),
                ..Default::default()
            },
        );

        let headers = adapter.headers().unwrap();
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "key-123");
        assert!(headers.get(API_KEY_HEADER).unwrap().is_sensitive());
    }
}
