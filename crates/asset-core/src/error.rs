//! 도메인 에러 타입.

use thiserror::Error;

use crate::MarketplaceKind;

/// 핵심 도메인 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 컬렉션에 마켓플레이스가 요구하는 참조 필드가 없음
    #[error("컬렉션 참조 누락: {kind} 컬렉션에는 `{field}` 값이 필요합니다")]
    MissingReference {
        kind: MarketplaceKind,
        field: &'static str,
    },

    /// 알 수 없는 마켓플레이스 이름
    #[error("알 수 없는 마켓플레이스: {0}")]
    UnknownMarketplace(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
