//! 환경변수 기반 설정 모듈.

use std::net::SocketAddr;
use std::time::Duration;

use asset_sources::{GameStopConfig, ImxConfig, OpenSeaConfig, SourcesConfig};
use secrecy::SecretString;

use crate::error::SyncError;
use crate::orchestrator::FailurePolicy;
use crate::SyncResult;

/// 기본 동기화 주기 (매일 자정, 초 필드 포함)
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * *";

/// 동기화 서비스 전체 설정
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 작업 스케줄 설정
    pub job: JobConfig,
    /// 마켓플레이스 어댑터 설정
    pub sources: SourcesConfig,
    /// 관리 API 설정
    pub admin: AdminConfig,
}

/// 데이터베이스 설정
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 데이터베이스 URL (dry-run이 아닌 모든 명령에서 필수)
    pub url: Option<String>,
    /// 커넥션 풀 크기
    pub max_connections: u32,
}

/// 작업 스케줄 설정
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// cron 표현식 (초 필드 포함 6자리)
    pub schedule: String,
    /// 잠금 만료 시간 (분). 미설정이면 수동 재활성화 전까지 잠금 유지
    pub lock_timeout_minutes: Option<u64>,
    /// 컬렉션 실패 처리 정책
    pub failure_policy: FailurePolicy,
}

/// 관리 API 서버 설정
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub host: String,
    pub port: u16,
}

impl SyncConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> SyncResult<Self> {
        dotenvy::dotenv().ok();

        let failure_policy = match std::env::var("SYNC_FAILURE_POLICY") {
            Ok(raw) => raw.parse().map_err(SyncError::Config)?,
            Err(_) => FailurePolicy::default(),
        };
        let max_failures = env_var_opt("PAGE_MAX_CONSECUTIVE_FAILURES");

        Ok(Self {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
                max_connections: env_var_parse("DATABASE_MAX_CONNECTIONS", 5),
            },
            job: JobConfig {
                schedule: std::env::var("ASSET_SYNC_SCHEDULE")
                    .unwrap_or_else(|_| DEFAULT_SCHEDULE.to_string()),
                lock_timeout_minutes: env_var_opt("JOB_LOCK_TIMEOUT_MINUTES"),
                failure_policy,
            },
            sources: SourcesConfig {
                http_timeout: Duration::from_secs(env_var_parse("HTTP_TIMEOUT_SECS", 30)),
                gamestop: GameStopConfig {
                    base_url: env_var_string("GS_API_URL", "https://api.nft.gamestop.com"),
                    page_delay: Duration::from_millis(env_var_parse("GS_PAGE_DELAY_MS", 600)),
                    max_consecutive_failures: max_failures,
                },
                imx: ImxConfig {
                    base_url: env_var_string("IMX_API_URL", "https://api.x.immutable.com"),
                    failure_delay: Duration::from_millis(env_var_parse(
                        "IMX_FAILURE_DELAY_MS",
                        1000,
                    )),
                    max_consecutive_failures: max_failures,
                },
                opensea: OpenSeaConfig {
                    base_url: env_var_string("OPENSEA_API_URL", "https://api.opensea.io"),
                    api_key: SecretString::from(
                        std::env::var("OPENSEA_API_KEY").unwrap_or_default(),
                    ),
                    page_delay: Duration::from_millis(env_var_parse("OPENSEA_API_DELAY_MS", 300)),
                    max_consecutive_failures: max_failures,
                },
            },
            admin: AdminConfig {
                host: env_var_string("ADMIN_HOST", "127.0.0.1"),
                port: env_var_parse("ADMIN_PORT", 3100),
            },
        })
    }
}

impl DatabaseConfig {
    /// DB URL 반환 (없으면 설정 에러)
    pub fn require_url(&self) -> SyncResult<&str> {
        self.url.as_deref().ok_or_else(|| {
            SyncError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }
}

impl JobConfig {
    /// 잠금 만료 시간을 Duration으로 반환
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
    }
}

impl AdminConfig {
    /// 바인드 주소
    pub fn socket_addr(&self) -> SyncResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| SyncError::Config(format!("잘못된 ADMIN_HOST/ADMIN_PORT: {}", e)))
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 설정된 경우에만 값 파싱
fn env_var_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_var_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
