//! cron 스케줄러와 작업 핸들.
//!
//! 작업 테이블은 생성 시점에 명시적으로 주입합니다. 전역 등록은 없습니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::Instrument;

use asset_core::job_span;

use crate::error::{SchedulerError, SchedulerResult};
use crate::store::JobState;

use super::{JobGuard, JobRunner, RunOutcome};

/// 스케줄러에 등록할 작업 정의
#[derive(Clone)]
pub struct JobDefinition {
    pub name: String,
    /// cron 표현식 (초 필드 포함 6자리)
    pub schedule: String,
    pub runner: Arc<dyn JobRunner>,
}

impl JobDefinition {
    pub fn new(
        name: impl Into<String>,
        schedule: impl Into<String>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            runner,
        }
    }
}

impl std::fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDefinition")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// 수동 트리거 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// 백그라운드 실행 시작
    Started,
    /// 이미 실행 중이거나 정지 상태 (아무것도 하지 않음)
    AlreadyRunning,
}

/// 이름으로 조회한 작업 핸들.
#[derive(Debug, Clone)]
pub struct JobHandle {
    definition: Arc<JobDefinition>,
    guard: JobGuard,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// 영속화된 작업 상태
    pub async fn state(&self) -> SchedulerResult<JobState> {
        self.guard
            .store()
            .find(self.name())
            .await?
            .ok_or_else(|| SchedulerError::JobNotFound(self.name().to_string()))
    }

    /// 작업 수동 정지. 진행 중인 실행은 끝까지 돌고, 끝난 뒤에도 정지가 유지됩니다.
    pub async fn disable(&self) -> SchedulerResult<()> {
        if !self.guard.store().set_paused(self.name(), true).await? {
            return Err(SchedulerError::JobNotFound(self.name().to_string()));
        }
        tracing::info!(job = self.name(), "작업 수동 정지");
        Ok(())
    }

    /// 작업 재활성화. 수동 정지와 크래시로 남은 잠금을 해제합니다.
    ///
    /// 이 프로세스에서 실행 중이면 `SchedulerError::JobRunning`.
    pub async fn enable(&self) -> SchedulerResult<()> {
        self.guard.rearm(self.name()).await?;
        tracing::info!(job = self.name(), "작업 재활성화");
        Ok(())
    }

    /// 가드를 거쳐 실행하고 완료까지 대기
    pub async fn run(&self) -> SchedulerResult<RunOutcome> {
        self.guard
            .run_guarded(&self.definition.name, self.definition.runner.as_ref())
            .instrument(job_span!(self.name(), "manual"))
            .await
    }

    /// 잠금을 획득한 뒤 백그라운드에서 실행.
    ///
    /// 잠금 획득은 호출 안에서 끝나므로 반환 시점에 중복 실행 여부가 결정됩니다.
    pub async fn trigger(&self) -> SchedulerResult<TriggerOutcome> {
        let Some(owner) = self.guard.acquire(self.name()).await? else {
            tracing::info!(job = self.name(), "이미 실행 중이거나 정지된 작업, 트리거 무시");
            return Ok(TriggerOutcome::AlreadyRunning);
        };

        let guard = self.guard.clone();
        let definition = Arc::clone(&self.definition);
        let span = job_span!(definition.name, "trigger");

        tokio::spawn(
            async move {
                guard
                    .run_acquired(&definition.name, owner, definition.runner.as_ref())
                    .await;
            }
            .instrument(span),
        );

        Ok(TriggerOutcome::Started)
    }
}

/// cron 기반 작업 스케줄러.
pub struct Scheduler {
    guard: JobGuard,
    jobs: HashMap<String, Arc<JobDefinition>>,
    cron: Mutex<Option<JobScheduler>>,
}

impl Scheduler {
    pub fn new(guard: JobGuard) -> Self {
        Self {
            guard,
            jobs: HashMap::new(),
            cron: Mutex::new(None),
        }
    }

    /// 작업 등록.
    ///
    /// 같은 이름은 한 번만 등록할 수 있고 cron 표현식은 등록 시점에 검증합니다.
    /// 작업 레코드는 저장소에 upsert되며 기존 실행 상태는 유지됩니다.
    pub async fn register(&mut self, definition: JobDefinition) -> SchedulerResult<()> {
        if self.jobs.contains_key(&definition.name) {
            return Err(SchedulerError::DuplicateJob(definition.name));
        }
        validate_schedule(&definition.schedule)?;

        self.guard
            .store()
            .ensure(&definition.name, &definition.schedule)
            .await?;

        tracing::info!(
            job = %definition.name,
            schedule = %definition.schedule,
            "작업 등록"
        );
        self.jobs
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// 이름으로 작업 조회
    pub fn job(&self, name: &str) -> SchedulerResult<JobHandle> {
        self.jobs
            .get(name)
            .map(|definition| JobHandle {
                definition: Arc::clone(definition),
                guard: self.guard.clone(),
            })
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))
    }

    /// 등록된 작업 이름 (정렬)
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.keys().cloned().collect();
        names.sort();
        names
    }

    /// cron 스케줄 시작. 각 실행은 가드를 거칩니다.
    pub async fn start(&self) -> SchedulerResult<()> {
        let mut cron = self.cron.lock().await;
        if cron.is_some() {
            return Ok(());
        }

        let sched = JobScheduler::new().await?;

        for definition in self.jobs.values() {
            let guard = self.guard.clone();
            let definition = Arc::clone(definition);
            let schedule = definition.schedule.clone();

            let job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
                let guard = guard.clone();
                let definition = Arc::clone(&definition);
                Box::pin(async move {
                    let span = job_span!(definition.name, "cron");
                    let result = guard
                        .run_guarded(&definition.name, definition.runner.as_ref())
                        .instrument(span)
                        .await;

                    if let Err(e) = result {
                        tracing::error!(job = %definition.name, error = %e, "스케줄 실행 실패");
                    }
                })
            })?;
            sched.add(job).await?;
        }

        sched.start().await?;
        *cron = Some(sched);

        tracing::info!(jobs = ?self.job_names(), "스케줄러 시작");
        Ok(())
    }

    /// cron 스케줄 중지. 실행 중인 작업은 중단하지 않습니다.
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        if let Some(mut sched) = self.cron.lock().await.take() {
            sched.shutdown().await?;
            tracing::info!("스케줄러 종료");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.job_names())
            .finish_non_exhaustive()
    }
}

/// cron 표현식 검증 (실제 스케줄에는 추가하지 않음)
fn validate_schedule(schedule: &str) -> SchedulerResult<()> {
    Job::new_async(schedule, |_uuid, _l| Box::pin(async {}))
        .map(|_| ())
        .map_err(|e| SchedulerError::InvalidSchedule {
            schedule: schedule.to_string(),
            message: e.to_string(),
        })
}
