//! 관리용 HTTP API.
//!
//! - `GET  /health` - liveness
//! - `GET  /api/v1/jobs/{name}` - 작업 상태 조회
//! - `POST /api/v1/jobs/{name}/run` - 수동 실행 (가드 적용)
//! - `POST /api/v1/jobs/{name}/rearm` - 크래시로 잠긴 작업 재활성화 (실행 중이면 409)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::SchedulerError;
use crate::job::{Scheduler, TriggerOutcome};
use crate::store::JobState;

/// 관리 API 공유 상태
#[derive(Debug, Clone)]
pub struct AdminState {
    pub scheduler: Arc<Scheduler>,
}

impl AdminState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

/// API 에러 응답.
///
/// ```json
/// { "code": "JOB_NOT_FOUND", "message": "작업을 찾을 수 없습니다: assets:missing" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ApiErrorResponse>);

fn scheduler_error(err: SchedulerError) -> ApiError {
    match err {
        SchedulerError::JobNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::new("JOB_NOT_FOUND", err.to_string())),
        ),
        SchedulerError::JobRunning(_) => (
            StatusCode::CONFLICT,
            Json(ApiErrorResponse::new("JOB_RUNNING", err.to_string())),
        ),
        other => {
            tracing::error!(error = %other, "관리 API 처리 실패");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::new("SCHEDULER_ERROR", other.to_string())),
            )
        }
    }
}

/// 작업 상태 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub state: JobState,
    /// 현재 실행 중 여부 (`disabled` + 잠금 시각)
    pub running: bool,
}

/// 실행/재활성화 요청 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: String,
}

impl ActionResponse {
    fn new(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

/// 간단한 헬스 체크.
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /api/v1/jobs/{name}
pub async fn get_job(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let handle = state.scheduler.job(&name).map_err(scheduler_error)?;
    let job = handle.state().await.map_err(scheduler_error)?;

    Ok(Json(JobStatusResponse {
        running: job.disabled && job.locked_at.is_some(),
        state: job,
    }))
}

/// POST /api/v1/jobs/{name}/run
pub async fn run_job(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<ActionResponse>), ApiError> {
    let handle = state.scheduler.job(&name).map_err(scheduler_error)?;

    match handle.trigger().await.map_err(scheduler_error)? {
        TriggerOutcome::Started => Ok((StatusCode::ACCEPTED, ActionResponse::new("started"))),
        TriggerOutcome::AlreadyRunning => {
            Ok((StatusCode::OK, ActionResponse::new("already_running")))
        }
    }
}

/// POST /api/v1/jobs/{name}/rearm
///
/// 이 프로세스에서 실행 중인 작업은 `409 JOB_RUNNING`.
pub async fn rearm_job(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let handle = state.scheduler.job(&name).map_err(scheduler_error)?;
    handle.enable().await.map_err(scheduler_error)?;

    tracing::warn!(job = %name, "작업 수동 재활성화");
    Ok(ActionResponse::new("rearmed"))
}

/// 작업 라우터
pub fn jobs_router() -> Router<Arc<AdminState>> {
    Router::new()
        .route("/{name}", get(get_job))
        .route("/{name}/run", post(run_job))
        .route("/{name}/rearm", post(rearm_job))
}

/// 관리 API 전체 라우터 생성.
pub fn create_admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/jobs", jobs_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 관리 API 서버 실행. `shutdown`이 완료되면 graceful shutdown.
pub async fn serve<F>(addr: SocketAddr, state: Arc<AdminState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "관리 API 서버 시작");

    axum::serve(listener, create_admin_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
