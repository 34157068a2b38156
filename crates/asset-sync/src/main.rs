//! Asset sync CLI.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use asset_core::{init_logging, LogConfig};
use asset_sources::AdapterRegistry;
use asset_sync::admin::{self, AdminState};
use asset_sync::store::{
    self, CollectionSource, JobStore, MemoryJobStore, MemorySnapshotStore, PgCollectionSource,
    PgJobStore, PgSnapshotStore, SnapshotStore,
};
use asset_sync::{
    JobDefinition, JobGuard, RunOutcome, Scheduler, SyncConfig, SyncOrchestrator, ASSETS_FETCH_JOB,
};

#[derive(Parser)]
#[command(name = "asset-sync")]
#[command(about = "Marketplace asset snapshot sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// DB 마이그레이션 적용
    Migrate,

    /// 동기화 1회 실행 (가드 적용)
    Run {
        /// 스냅샷을 DB에 쓰지 않고 메모리에만 교체 (컬렉션은 DB에서 읽음)
        #[arg(long)]
        dry_run: bool,
    },

    /// 데몬 모드: cron 스케줄 + 관리 API
    Daemon,

    /// 작업 상태 출력
    Status {
        #[arg(long, default_value = ASSETS_FETCH_JOB)]
        job: String,
    },

    /// 크래시로 잠긴 작업 또는 수동 정지된 작업 재활성화
    Rearm {
        #[arg(long, default_value = ASSETS_FETCH_JOB)]
        job: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    let default_filter = format!(
        "asset_sync={level},asset_sources={level},asset_core={level}",
        level = cli.log_level
    );
    init_logging(LogConfig::from_env(&default_filter))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Asset Sync 시작");

    // 설정 로드
    let config = SyncConfig::from_env()?;
    tracing::debug!(
        schedule = %config.job.schedule,
        policy = %config.job.failure_policy,
        "설정 로드 완료"
    );

    // DB 연결
    let pool = connect(&config).await?;
    tracing::info!("데이터베이스 연결 성공");

    match cli.command {
        Commands::Migrate => {
            store::migrate(&pool).await.context("마이그레이션 실패")?;
            tracing::info!("마이그레이션 완료");
        }
        Commands::Run { dry_run } => {
            let (snapshot, jobs): (Arc<dyn SnapshotStore>, Arc<dyn JobStore>) = if dry_run {
                tracing::info!("dry-run: 스냅샷은 메모리에만 기록됩니다");
                (
                    Arc::new(MemorySnapshotStore::new()),
                    Arc::new(MemoryJobStore::new()),
                )
            } else {
                (
                    Arc::new(PgSnapshotStore::new(pool.clone())),
                    Arc::new(PgJobStore::new(pool.clone())),
                )
            };

            let scheduler = build_scheduler(&config, &pool, snapshot.clone(), jobs).await?;
            let outcome = scheduler.job(ASSETS_FETCH_JOB)?.run().await?;

            match outcome {
                RunOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    if dry_run {
                        println!("snapshot rows (memory): {}", snapshot.count().await?);
                    }
                }
                RunOutcome::Failed(message) => {
                    pool.close().await;
                    anyhow::bail!("동기화 실패: {}", message);
                }
                RunOutcome::Skipped => {
                    tracing::warn!(
                        "작업이 이미 실행 중이거나 비활성 상태입니다 (필요 시 `asset-sync rearm`)"
                    );
                }
            }
        }
        Commands::Daemon => run_daemon(&config, &pool).await?,
        Commands::Status { job } => {
            let state = PgJobStore::new(pool.clone())
                .find(&job)
                .await?
                .with_context(|| format!("작업을 찾을 수 없습니다: {}", job))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Rearm { job } => {
            if !PgJobStore::new(pool.clone()).rearm(&job).await? {
                anyhow::bail!("작업을 찾을 수 없습니다: {}", job);
            }
            tracing::warn!(job = %job, "작업 수동 재활성화");
        }
    }

    pool.close().await;
    tracing::info!("Asset Sync 종료");

    Ok(())
}

async fn connect(config: &SyncConfig) -> anyhow::Result<PgPool> {
    let url = config.database.require_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("데이터베이스 연결 실패")?;
    Ok(pool)
}

/// 오케스트레이터와 `assets:fetch` 작업을 등록한 스케줄러 생성
async fn build_scheduler(
    config: &SyncConfig,
    pool: &PgPool,
    snapshot: Arc<dyn SnapshotStore>,
    jobs: Arc<dyn JobStore>,
) -> anyhow::Result<Scheduler> {
    let registry = AdapterRegistry::from_config(&config.sources)?;
    let collections: Arc<dyn CollectionSource> = Arc::new(PgCollectionSource::new(pool.clone()));

    let orchestrator = SyncOrchestrator::new(collections, snapshot, Arc::new(registry))
        .with_policy(config.job.failure_policy);

    let mut scheduler = Scheduler::new(JobGuard::new(jobs, config.job.lock_timeout()));
    scheduler
        .register(JobDefinition::new(
            ASSETS_FETCH_JOB,
            config.job.schedule.clone(),
            Arc::new(orchestrator),
        ))
        .await?;

    Ok(scheduler)
}

async fn run_daemon(config: &SyncConfig, pool: &PgPool) -> anyhow::Result<()> {
    let scheduler = Arc::new(
        build_scheduler(
            config,
            pool,
            Arc::new(PgSnapshotStore::new(pool.clone())),
            Arc::new(PgJobStore::new(pool.clone())),
        )
        .await?,
    );

    tracing::info!(
        "=== 데몬 모드 시작 (스케줄: {}) ===",
        config.job.schedule
    );
    scheduler.start().await?;

    let addr = config.admin.socket_addr()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(admin::serve(
        addr,
        Arc::new(AdminState::new(Arc::clone(&scheduler))),
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("종료 신호 수신, 데몬 종료 중...");
        }
        result = &mut server => {
            tracing::error!(?result, "관리 API 서버가 예기치 않게 종료됨");
        }
    }

    scheduler.shutdown().await?;
    let _ = shutdown_tx.send(());
    if !server.is_finished() {
        server.await.context("관리 API 서버 태스크 실패")??;
    }

    Ok(())
}
