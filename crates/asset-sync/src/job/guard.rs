//! 작업 이름 기준 잠금 관리자.

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::stats::SyncReport;
use crate::store::{JobStatus, JobStore};

use super::JobRunner;

/// 가드를 거친 실행 결과
#[derive(Debug)]
pub enum RunOutcome {
    /// 실행 완료
    Completed(SyncReport),
    /// 실행 실패 (잠금은 해제됨)
    Failed(String),
    /// 이미 실행 중이거나 정지 상태라 시작하지 않음
    Skipped,
}

impl RunOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// 영속 잠금 기반 중복 실행 방지 가드.
///
/// 잠금 상태는 [`JobStore`]에 기록되므로 프로세스가 여러 개여도 한 번에 하나만 실행됩니다.
/// 해제는 잠금을 획득할 때 받은 소유 토큰으로만 가능합니다.
/// 이 프로세스에서 실행 중인 작업 이름은 따로 추적해서, 실행 도중의 재활성화를 막습니다.
#[derive(Clone)]
pub struct JobGuard {
    store: Arc<dyn JobStore>,
    lock_timeout: Option<Duration>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl JobGuard {
    /// `lock_timeout`이 `None`이면 남은 잠금은 수동 재활성화 전까지 만료되지 않습니다.
    pub fn new(store: Arc<dyn JobStore>, lock_timeout: Option<Duration>) -> Self {
        Self {
            store,
            lock_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// 잠금 획득 시도. 성공하면 소유 토큰 반환
    pub async fn acquire(&self, name: &str) -> SchedulerResult<Option<Uuid>> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.contains(name) {
            return Ok(None);
        }

        let owner = self.store.try_acquire(name, self.lock_timeout).await?;
        if owner.is_some() {
            in_flight.insert(name.to_string());
        }
        Ok(owner)
    }

    /// 이 프로세스에서 실행 중이 아닐 때만 재활성화 (수동 정지와 남은 잠금 해제)
    pub async fn rearm(&self, name: &str) -> SchedulerResult<()> {
        let in_flight = self.in_flight.lock().await;
        if in_flight.contains(name) {
            return Err(SchedulerError::JobRunning(name.to_string()));
        }

        if !self.store.rearm(name).await? {
            return Err(SchedulerError::JobNotFound(name.to_string()));
        }
        Ok(())
    }

    /// 잠금을 획득한 경우에만 실행
    pub async fn run_guarded(
        &self,
        name: &str,
        runner: &dyn JobRunner,
    ) -> SchedulerResult<RunOutcome> {
        let Some(owner) = self.acquire(name).await? else {
            tracing::info!(job = name, "이미 실행 중이거나 정지된 작업, 건너뜀");
            return Ok(RunOutcome::Skipped);
        };

        Ok(self.run_acquired(name, owner, runner).await)
    }

    /// 이미 잠금을 획득한 상태에서 실행하고 결과와 함께 잠금 해제.
    ///
    /// 실행이 panic으로 끝나도 해제를 시도합니다.
    pub(crate) async fn run_acquired(
        &self,
        name: &str,
        owner: Uuid,
        runner: &dyn JobRunner,
    ) -> RunOutcome {
        tracing::info!(job = name, "작업 실행 시작");

        let (status, error, outcome) = match AssertUnwindSafe(runner.run()).catch_unwind().await {
            Ok(Ok(report)) => (JobStatus::Success, None, RunOutcome::Completed(report)),
            Ok(Err(e)) => {
                let message = e.to_string();
                tracing::error!(job = name, error = %message, "작업 실행 실패");
                (
                    JobStatus::Failure,
                    Some(message.clone()),
                    RunOutcome::Failed(message),
                )
            }
            Err(_) => {
                let message = "작업 실행 중 panic 발생".to_string();
                tracing::error!(job = name, "{}", message);
                (
                    JobStatus::Failure,
                    Some(message.clone()),
                    RunOutcome::Failed(message),
                )
            }
        };

        let mut in_flight = self.in_flight.lock().await;
        match self
            .store
            .release(name, owner, status, error.as_deref())
            .await
        {
            Ok(true) => {
                tracing::info!(job = name, status = status.as_str(), "작업 실행 종료");
            }
            Ok(false) => {
                // 만료된 잠금을 다른 실행이 가져감
                tracing::warn!(job = name, "잠금 소유자가 바뀌어 해제하지 않음");
            }
            Err(e) => {
                // 해제 실패 시 작업은 비활성 상태로 남음
                tracing::error!(
                    job = name,
                    error = %e,
                    "작업 잠금 해제 실패, 수동 재활성화 필요"
                );
            }
        }
        in_flight.remove(name);

        outcome
    }
}

impl std::fmt::Debug for JobGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobGuard")
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}
