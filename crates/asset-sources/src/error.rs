//! 소스 어댑터 에러 타입.

use asset_core::{CoreError, MarketplaceKind};
use thiserror::Error;

/// 마켓플레이스 조회 관련 에러.
///
/// 페이지 단위의 비성공 응답은 에러가 아니라 [`crate::PageResponse::Failed`]로
/// 전달되며, 여기 정의된 에러는 모두 `fetch_all` 밖으로 전파되는 치명적 에러입니다.
#[derive(Debug, Error)]
pub enum SourceError {
    /// 네트워크/전송 에러
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 응답 본문 디코딩 실패
    #[error("Decode error ({url}): {message}")]
    Decode { url: String, message: String },

    /// 컬렉션 설정 오류
    #[error("Invalid collection: {0}")]
    InvalidCollection(#[from] CoreError),

    /// 등록된 어댑터 없음
    #[error("No adapter registered for {0}")]
    NoAdapter(MarketplaceKind),

    /// 연속 실패 페이지 수 초과
    #[error("{kind}: {failures} consecutive failed pages")]
    TooManyFailedPages {
        kind: MarketplaceKind,
        failures: u32,
    },

    /// 잘못된 URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// 잘못된 API 키 (헤더로 사용할 수 없음)
    #[error("Invalid API key for {0}")]
    InvalidApiKey(MarketplaceKind),
}

/// 소스 작업을 위한 Result 타입.
pub type SourceResult<T> = Result<T, SourceError>;
