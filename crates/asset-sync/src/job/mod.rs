//! 스케줄 작업과 중복 실행 방지 가드.
//!
//! 작업 상태 머신:
//!
//! ```text
//! ENABLED ──(실행 시작, 잠금)──▶ DISABLED+RUNNING ──(성공/실패 기록)──▶ ENABLED
//! ```
//!
//! 잠금은 작업 시작 전에 기록되고 실행이 끝난 뒤에야 해제됩니다.
//! 실행 중 프로세스가 죽으면 작업은 비활성 상태로 남으며,
//! 수동 재활성화(`rearm`) 또는 설정된 잠금 만료 후에만 다시 실행됩니다.

pub mod guard;
pub mod scheduler;

use async_trait::async_trait;

use crate::stats::SyncReport;
use crate::SyncResult;

pub use guard::{JobGuard, RunOutcome};
pub use scheduler::{JobDefinition, JobHandle, Scheduler, TriggerOutcome};

/// 에셋 스냅샷 동기화 작업 이름
pub const ASSETS_FETCH_JOB: &str = "assets:fetch";

/// 스케줄러가 실행하는 작업 본문.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self) -> SyncResult<SyncReport>;
}
