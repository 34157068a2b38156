//! 에러 타입 정의.

use std::fmt;

use asset_sources::SourceError;
use thiserror::Error;

/// 동기화 에러 타입
#[derive(Debug)]
pub enum SyncError {
    /// 데이터베이스 에러
    Database(sqlx::Error),
    /// 설정 에러
    Config(String),
    /// 마켓플레이스 소스 에러 (컬렉션 이름 포함)
    Source {
        collection: String,
        source: SourceError,
    },
    /// 스케줄러 에러
    Scheduler(SchedulerError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Source { collection, source } => {
                write!(f, "Source error ({}): {}", collection, source)
            }
            Self::Scheduler(e) => write!(f, "Scheduler error: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            Self::Source { source, .. } => Some(source),
            Self::Scheduler(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<sqlx::migrate::MigrateError> for SyncError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(sqlx::Error::Migrate(Box::new(err)))
    }
}

impl From<SchedulerError> for SyncError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

/// Result 타입 별칭
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// 스케줄러 에러.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// 등록되지 않은 작업 이름
    #[error("작업을 찾을 수 없습니다: {0}")]
    JobNotFound(String),

    /// 이 프로세스에서 실행 중이라 재활성화할 수 없음
    #[error("작업이 실행 중입니다: {0}")]
    JobRunning(String),

    /// 같은 이름으로 두 번 등록
    #[error("이미 등록된 작업입니다: {0}")]
    DuplicateJob(String),

    /// cron 표현식 오류
    #[error("잘못된 스케줄 '{schedule}': {message}")]
    InvalidSchedule { schedule: String, message: String },

    /// 작업 상태 저장소 에러
    #[error("작업 상태 저장소 에러: {0}")]
    Store(#[from] sqlx::Error),

    /// cron 런타임 에러
    #[error("cron 스케줄러 에러: {0}")]
    Cron(#[from] tokio_cron_scheduler::JobSchedulerError),
}

/// 스케줄러 Result 타입 별칭
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
