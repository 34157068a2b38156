//! 마켓플레이스 에셋 스냅샷 동기화 서비스.
//!
//! 이 crate는 다음을 제공합니다:
//! - 컬렉션별 병렬 조회 후 스냅샷 전체 교체 ([`SyncOrchestrator`])
//! - cron 스케줄과 영속 잠금 기반 중복 실행 방지 ([`job`])
//! - 수동 실행/재활성화용 관리 API ([`admin`])
//! - PostgreSQL / 인메모리 저장소 ([`store`])

pub mod admin;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod stats;
pub mod store;

pub use config::SyncConfig;
pub use error::{SchedulerError, SchedulerResult, SyncError, SyncResult};
pub use job::{
    JobDefinition, JobGuard, JobHandle, JobRunner, RunOutcome, Scheduler, TriggerOutcome,
    ASSETS_FETCH_JOB,
};
pub use orchestrator::{FailurePolicy, SyncOrchestrator};
pub use stats::SyncReport;
