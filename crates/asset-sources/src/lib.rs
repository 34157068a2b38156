//! 마켓플레이스 소스 어댑터.
//!
//! 마켓플레이스마다 페이지네이션 방식과 rate limit이 다르지만 모두
//! [`SourceAdapter::fetch_all`] 계약 하나로 통일됩니다.
//!
//! | 마켓플레이스 | 페이지네이션 | 딜레이 |
//! |---|---|---|
//! | GameStop | offset/limit + totalNum | 고정 600ms |
//! | IMX | 불투명 커서, 빈 페이지에서 종료 | 없음 |
//! | OpenSea | API 키 + next 토큰 | 설정 (기본 300ms) |

pub mod adapter;
pub mod error;
pub mod gamestop;
pub mod http;
pub mod imx;
pub mod opensea;

use std::sync::Arc;
use std::time::Duration;

pub use adapter::{AdapterRegistry, PagePolicy, SourceAdapter};
pub use error::{SourceError, SourceResult};
pub use gamestop::{GameStopAdapter, GameStopConfig};
pub use http::{JsonClient, PageResponse};
pub use imx::{ImxAdapter, ImxConfig};
pub use opensea::{OpenSeaAdapter, OpenSeaConfig};

/// 전체 소스 어댑터 설정.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    /// 요청 타임아웃
    pub http_timeout: Duration,
    pub gamestop: GameStopConfig,
    pub imx: ImxConfig,
    pub opensea: OpenSeaConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            gamestop: GameStopConfig::default(),
            imx: ImxConfig::default(),
            opensea: OpenSeaConfig::default(),
        }
    }
}

impl AdapterRegistry {
    /// 세 마켓플레이스 어댑터를 모두 등록한 레지스트리 생성.
    ///
    /// 모든 어댑터가 하나의 HTTP 커넥션 풀을 공유합니다.
    pub fn from_config(config: &SourcesConfig) -> SourceResult<Self> {
        let client = JsonClient::new(config.http_timeout)?;

        let mut registry = Self::new();
        registry
            .register(Arc::new(GameStopAdapter::new(
                client.clone(),
                config.gamestop.clone(),
            )))
            .register(Arc::new(ImxAdapter::new(client.clone(), config.imx.clone())))
            .register(Arc::new(OpenSeaAdapter::new(client, config.opensea.clone())));

        Ok(registry)
    }
}
