//! 작업 가드 / 스케줄러 통합 테스트.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use asset_sync::store::{JobState, JobStatus, JobStore, MemoryJobStore, SnapshotStore};
use asset_sync::{
    JobDefinition, JobGuard, JobRunner, RunOutcome, Scheduler, SchedulerError, SyncError,
    SyncReport, SyncResult, TriggerOutcome, ASSETS_FETCH_JOB,
};
use common::{all_adapters, fixture, orchestrator, BlockingRunner, CountingRunner};

const DAILY: &str = "0 0 0 * * *";

async fn scheduler_with(
    store: Arc<MemoryJobStore>,
    lock_timeout: Option<Duration>,
    runner: Arc<dyn JobRunner>,
) -> Scheduler {
    let mut scheduler = Scheduler::new(JobGuard::new(store, lock_timeout));
    scheduler
        .register(JobDefinition::new(ASSETS_FETCH_JOB, DAILY, runner))
        .await
        .unwrap();
    scheduler
}

/// 잠금이 풀릴 때까지 대기 (백그라운드 실행 완료 확인용)
async fn wait_released(store: &MemoryJobStore) -> JobState {
    for _ in 0..200 {
        let state = store.find(ASSETS_FETCH_JOB).await.unwrap().unwrap();
        if !state.disabled {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job was never released");
}

struct FailingRunner;

#[async_trait]
impl JobRunner for FailingRunner {
    async fn run(&self) -> SyncResult<SyncReport> {
        Err(SyncError::Config("boom".to_string()))
    }
}

struct PanickingRunner;

#[async_trait]
impl JobRunner for PanickingRunner {
    async fn run(&self) -> SyncResult<SyncReport> {
        panic!("runner exploded");
    }
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = scheduler_with(store, None, Arc::new(CountingRunner::default())).await;

    let err = scheduler.job("assets:missing").unwrap_err();
    assert!(matches!(err, SchedulerError::JobNotFound(name) if name == "assets:missing"));
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(CountingRunner::default());
    let mut scheduler = scheduler_with(store, None, runner.clone()).await;

    let err = scheduler
        .register(JobDefinition::new(ASSETS_FETCH_JOB, DAILY, runner))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateJob(_)));
    assert_eq!(scheduler.job_names(), vec![ASSETS_FETCH_JOB.to_string()]);
}

#[tokio::test]
async fn test_invalid_schedule_rejected() {
    let store = Arc::new(MemoryJobStore::new());
    let mut scheduler = Scheduler::new(JobGuard::new(store.clone(), None));

    let err = scheduler
        .register(JobDefinition::new(
            ASSETS_FETCH_JOB,
            "every day at noon",
            Arc::new(CountingRunner::default()),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::InvalidSchedule { .. }));
    assert!(store.find(ASSETS_FETCH_JOB).await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_records_success_and_reenables() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(CountingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    let outcome = handle.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let state = handle.state().await.unwrap();
    assert!(!state.disabled);
    assert!(state.locked_at.is_none());
    assert_eq!(state.last_status, Some(JobStatus::Success));
    assert_eq!(state.run_count, 1);
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_run_still_releases_guard() {
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = scheduler_with(store.clone(), None, Arc::new(FailingRunner)).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    let outcome = handle.run().await.unwrap();
    match outcome {
        RunOutcome::Failed(message) => assert!(message.contains("boom")),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let state = handle.state().await.unwrap();
    assert!(!state.disabled);
    assert_eq!(state.last_status, Some(JobStatus::Failure));
    assert!(state.last_error.unwrap().contains("boom"));
}

#[tokio::test]
async fn test_panicking_run_still_releases_guard() {
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = scheduler_with(store.clone(), None, Arc::new(PanickingRunner)).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    let outcome = handle.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert!(!handle.state().await.unwrap().disabled);
}

#[tokio::test]
async fn test_disabled_job_is_not_run_again() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(CountingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    // 다른 실행이 진행 중인 상태 재현
    assert!(store.try_acquire(ASSETS_FETCH_JOB, None).await.unwrap().is_some());

    let outcome = handle.run().await.unwrap();
    assert!(outcome.is_skipped());
    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::AlreadyRunning);
    assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_trigger_while_in_flight_does_not_start_second_run() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(BlockingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::Started);
    runner.started.notified().await;

    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::AlreadyRunning);
    assert!(handle.run().await.unwrap().is_skipped());
    assert!(handle.state().await.unwrap().disabled);

    runner.release();
    let state = wait_released(&store).await;
    assert_eq!(state.last_status, Some(JobStatus::Success));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_crashed_lock_stays_until_rearm() {
    let store = Arc::new(MemoryJobStore::new());
    let mut crashed = JobState::new(ASSETS_FETCH_JOB, DAILY);
    crashed.disabled = true;
    crashed.locked_at = Some(Utc::now() - chrono::Duration::days(2));
    crashed.lock_owner = Some(Uuid::new_v4());
    store.insert_state(crashed).await;

    let runner = Arc::new(CountingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    // 등록(upsert)은 남은 잠금을 건드리지 않음
    assert!(handle.run().await.unwrap().is_skipped());

    handle.enable().await.unwrap();
    assert!(matches!(handle.run().await.unwrap(), RunOutcome::Completed(_)));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_lock_expires_with_timeout() {
    let store = Arc::new(MemoryJobStore::new());
    let mut crashed = JobState::new(ASSETS_FETCH_JOB, DAILY);
    crashed.disabled = true;
    crashed.locked_at = Some(Utc::now() - chrono::Duration::hours(3));
    store.insert_state(crashed).await;

    let runner = Arc::new(CountingRunner::default());
    let scheduler = scheduler_with(
        store.clone(),
        Some(Duration::from_secs(60 * 60)),
        runner.clone(),
    )
    .await;

    let outcome = scheduler.job(ASSETS_FETCH_JOB).unwrap().run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_manual_disable_blocks_runs() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(CountingRunner::default());
    let scheduler = scheduler_with(
        store.clone(),
        Some(Duration::from_secs(1)),
        runner.clone(),
    )
    .await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    handle.disable().await.unwrap();
    assert!(handle.run().await.unwrap().is_skipped());

    handle.enable().await.unwrap();
    assert!(!handle.run().await.unwrap().is_skipped());
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_lock_takeover_is_not_released_by_previous_owner() {
    let store = Arc::new(MemoryJobStore::new());
    let timeout = Some(Duration::from_millis(200));

    // 같은 저장소를 공유하는 두 프로세스
    let slow = Arc::new(BlockingRunner::default());
    let first = scheduler_with(store.clone(), timeout, slow.clone()).await;
    let takeover = Arc::new(BlockingRunner::default());
    let second = scheduler_with(store.clone(), timeout, takeover.clone()).await;

    let first_handle = first.job(ASSETS_FETCH_JOB).unwrap();
    let first_run = tokio::spawn(async move { first_handle.run().await });
    slow.started.notified().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let second_handle = second.job(ASSETS_FETCH_JOB).unwrap();
    assert_eq!(second_handle.trigger().await.unwrap(), TriggerOutcome::Started);
    takeover.started.notified().await;
    let takeover_owner = store.find(ASSETS_FETCH_JOB).await.unwrap().unwrap().lock_owner;

    // 먼저 시작한 실행이 끝나도 새 소유자의 잠금은 유지됨
    slow.release();
    let outcome = first_run.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let state = store.find(ASSETS_FETCH_JOB).await.unwrap().unwrap();
    assert!(state.disabled);
    assert_eq!(state.lock_owner, takeover_owner);

    let counting = Arc::new(CountingRunner::default());
    let third = scheduler_with(store.clone(), timeout, counting.clone()).await;
    assert!(third.job(ASSETS_FETCH_JOB).unwrap().run().await.unwrap().is_skipped());
    assert_eq!(counting.runs.load(Ordering::SeqCst), 0);

    takeover.release();
    let state = wait_released(&store).await;
    assert_eq!(state.last_status, Some(JobStatus::Success));
    assert!(state.lock_owner.is_none());
}

#[tokio::test]
async fn test_rearm_refused_while_running_in_process() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(BlockingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::Started);
    runner.started.notified().await;

    let err = handle.enable().await.unwrap_err();
    assert!(matches!(err, SchedulerError::JobRunning(name) if name == ASSETS_FETCH_JOB));
    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::AlreadyRunning);

    runner.release();
    wait_released(&store).await;
    handle.enable().await.unwrap();
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_manual_disable_during_run_survives_release() {
    let store = Arc::new(MemoryJobStore::new());
    let runner = Arc::new(BlockingRunner::default());
    let scheduler = scheduler_with(store.clone(), None, runner.clone()).await;
    let handle = scheduler.job(ASSETS_FETCH_JOB).unwrap();

    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::Started);
    runner.started.notified().await;
    handle.disable().await.unwrap();

    runner.release();
    let state = wait_released(&store).await;
    assert!(state.paused);
    assert_eq!(state.last_status, Some(JobStatus::Success));

    assert!(handle.run().await.unwrap().is_skipped());
    assert_eq!(handle.trigger().await.unwrap(), TriggerOutcome::AlreadyRunning);
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_guarded_orchestrator_run_writes_snapshot() {
    let fx = fixture();
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = scheduler_with(
        store,
        None,
        Arc::new(orchestrator(&fx, all_adapters(2))),
    )
    .await;

    match scheduler.job(ASSETS_FETCH_JOB).unwrap().run().await.unwrap() {
        RunOutcome::Completed(report) => assert_eq!(report.inserted, 6),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(fx.snapshot.count().await.unwrap(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_start_and_shutdown() {
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = scheduler_with(store, None, Arc::new(CountingRunner::default())).await;

    scheduler.start().await.unwrap();
    // 두 번째 start는 무시
    scheduler.start().await.unwrap();
    scheduler.shutdown().await.unwrap();
}
