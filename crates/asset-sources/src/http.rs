//! 마켓플레이스 API용 JSON HTTP 클라이언트.
//!
//! 요청 한 번을 보내고 상태 코드와 파싱된 본문을 돌려줄 뿐, 재시도는 하지 않습니다.
//! 재시도/대기 정책은 전적으로 호출하는 어댑터의 몫입니다.

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{SourceError, SourceResult};

const USER_AGENT: &str = concat!("asset-sync/", env!("CARGO_PKG_VERSION"));

/// 단일 페이지 요청 결과.
#[derive(Debug)]
pub enum PageResponse<T> {
    /// 2xx 응답, 본문 파싱 성공
    Success(T),
    /// 비성공 응답 (본문은 버림)
    Failed(StatusCode),
}

/// 재시도 없는 JSON GET 클라이언트.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
}

impl JsonClient {
    /// 요청 타임아웃을 지정하여 생성.
    pub fn new(timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// 기존 reqwest 클라이언트로 생성.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// GET 요청 한 번을 보내고 결과를 반환합니다.
    ///
    /// 전송 실패와 2xx 응답의 파싱 실패는 에러로, 비성공 상태 코드는
    /// [`PageResponse::Failed`]로 반환합니다.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> SourceResult<PageResponse<T>> {
        let response = self.client.get(url.clone()).headers(headers).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(PageResponse::Failed(status));
        }

        let body = response.bytes().await?;
        let parsed = serde_json::from_slice(&body).map_err(|e| SourceError::Decode {
            url: redact(url),
            message: e.to_string(),
        })?;

        Ok(PageResponse::Success(parsed))
    }
}

/// 로그/에러 메시지용 URL (쿼리 제외).
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// `{base}{path}` URL 생성.
pub(crate) fn endpoint(base_url: &str, path: &str) -> SourceResult<Url> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let url = endpoint("https://api.x.immutable.com/", "/v1/assets").unwrap();
        assert_eq!(url.as_str(), "https://api.x.immutable.com/v1/assets");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert!(matches!(
            endpoint("not a url", "/v1"),
            Err(SourceError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_redact_drops_query() {
        let url = Url::parse("https://api.opensea.io/v2/collection/x/nfts?limit=50&next=abc").unwrap();
        assert_eq!(redact(&url), "https://api.opensea.io/v2/collection/x/nfts");
    }
}
