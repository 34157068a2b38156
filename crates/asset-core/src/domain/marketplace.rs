//! 마켓플레이스 종류 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// 에셋을 가져오는 외부 마켓플레이스 종류.
///
/// 컬렉션 생성 후 변경되지 않으며, 어떤 어댑터와 어떤 참조 필드를
/// 사용할지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketplaceKind {
    /// GameStop NFT 마켓플레이스
    GameStop,
    /// Immutable X
    Imx,
    /// OpenSea
    OpenSea,
}

/// 마켓플레이스 API의 페이지네이션 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// offset/limit + 전체 개수
    OffsetLimit,
    /// 불투명 커서
    Cursor,
    /// API 키가 필요한 커서 + next 토큰
    KeyedCursor,
}

impl MarketplaceKind {
    /// 모든 마켓플레이스 종류 반환.
    pub fn all() -> [MarketplaceKind; 3] {
        [
            MarketplaceKind::GameStop,
            MarketplaceKind::Imx,
            MarketplaceKind::OpenSea,
        ]
    }

    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketplaceKind::GameStop => "GAMESTOP",
            MarketplaceKind::Imx => "IMX",
            MarketplaceKind::OpenSea => "OPENSEA",
        }
    }

    /// 해당 마켓플레이스의 페이지네이션 방식.
    pub fn pagination(&self) -> PaginationStyle {
        match self {
            MarketplaceKind::GameStop => PaginationStyle::OffsetLimit,
            MarketplaceKind::Imx => PaginationStyle::Cursor,
            MarketplaceKind::OpenSea => PaginationStyle::KeyedCursor,
        }
    }
}

impl fmt::Display for MarketplaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketplaceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GAMESTOP" => Ok(Self::GameStop),
            "IMX" => Ok(Self::Imx),
            "OPENSEA" => Ok(Self::OpenSea),
            _ => Err(CoreError::UnknownMarketplace(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketplace_from_str() {
        assert_eq!(
            "gamestop".parse::<MarketplaceKind>().unwrap(),
            MarketplaceKind::GameStop
        );
        assert_eq!("IMX".parse::<MarketplaceKind>().unwrap(), MarketplaceKind::Imx);
        assert_eq!(
            " OpenSea ".parse::<MarketplaceKind>().unwrap(),
            MarketplaceKind::OpenSea
        );
        assert!(matches!(
            "rarible".parse::<MarketplaceKind>(),
            Err(CoreError::UnknownMarketplace(_))
        ));
    }

    #[test]
    fn test_marketplace_round_trip_str() {
        for kind in MarketplaceKind::all() {
            assert_eq!(kind.as_str().parse::<MarketplaceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_pagination_style_per_kind() {
        assert_eq!(MarketplaceKind::GameStop.pagination(), PaginationStyle::OffsetLimit);
        assert_eq!(MarketplaceKind::Imx.pagination(), PaginationStyle::Cursor);
        assert_eq!(MarketplaceKind::OpenSea.pagination(), PaginationStyle::KeyedCursor);
    }

    #[test]
    fn test_marketplace_serde_uppercase() {
        let json = serde_json::to_string(&MarketplaceKind::OpenSea).unwrap();
        assert_eq!(json, "\"OPENSEA\"");
    }
}
