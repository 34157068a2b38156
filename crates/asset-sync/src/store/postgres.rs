//! PostgreSQL 저장소 구현.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

use asset_core::{Asset, Collection, MarketplaceKind, NewAsset};

use crate::SyncResult;

use super::{
    CollectionSource, JobState, JobStatus, JobStore, ReplaceSummary, SnapshotStore, StoreResult,
};

/// 다중 행 INSERT 한 번에 넣는 행 수 (행당 바인드 12개, Postgres 바인드 한도 65535)
const INSERT_CHUNK: usize = 1000;

/// `migrations/` 디렉토리의 스키마 적용.
pub async fn migrate(pool: &PgPool) -> SyncResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// `collections` 테이블.
#[derive(Debug, Clone)]
pub struct PgCollectionSource {
    pool: PgPool,
}

impl PgCollectionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn collection_from_row(row: &PgRow) -> StoreResult<Collection> {
    let kind: String = row.try_get("kind")?;
    let kind: MarketplaceKind = kind.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: "kind".to_string(),
        source: Box::new(e),
    })?;

    Ok(Collection {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind,
        address: row.try_get("address")?,
        slug: row.try_get("slug")?,
        external_id: row.try_get("external_id")?,
        meta: row
            .try_get::<Option<serde_json::Value>, _>("meta")?
            .unwrap_or(serde_json::Value::Null),
    })
}

#[async_trait]
impl CollectionSource for PgCollectionSource {
    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, kind, address, slug, external_id, meta
            FROM collections
            ORDER BY created_at, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(collection_from_row).collect()
    }
}

/// `assets` 테이블.
///
/// [`SnapshotStore::replace_all`]은 삭제와 삽입을 한 트랜잭션에서 수행하므로
/// 다른 세션은 이전 스냅샷 또는 새 스냅샷만 보게 됩니다.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_chunked(conn: &mut PgConnection, assets: &[NewAsset]) -> StoreResult<u64> {
    let mut inserted = 0;

    for chunk in assets.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO assets (id, iid, collection_id, name, description, image, address, owner, meta, url, created_at, updated_at) ",
        );
        builder.push_values(chunk, |mut row, asset| {
            row.push_bind(Uuid::new_v4())
                .push_bind(&asset.iid)
                .push_bind(asset.collection_id)
                .push_bind(&asset.name)
                .push_bind(&asset.description)
                .push_bind(&asset.image)
                .push_bind(&asset.address)
                .push_bind(&asset.owner)
                .push_bind(&asset.meta)
                .push_bind(&asset.url)
                .push_bind(asset.created_at)
                .push_bind(asset.updated_at);
        });

        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM assets")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&self, assets: &[NewAsset]) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        insert_chunked(&mut conn, assets).await
    }

    async fn replace_all(&self, assets: &[NewAsset]) -> StoreResult<ReplaceSummary> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM assets")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let inserted = insert_chunked(&mut tx, assets).await?;

        tx.commit().await?;

        tracing::debug!(deleted, inserted, "스냅샷 트랜잭션 커밋");
        Ok(ReplaceSummary { deleted, inserted })
    }

    async fn count(&self) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list(&self) -> StoreResult<Vec<Asset>> {
        sqlx::query_as::<_, Asset>(
            r#"
            SELECT id, iid, collection_id, name, description, image, address, owner, meta, url, created_at, updated_at
            FROM assets
            ORDER BY collection_id, iid
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// `sync_jobs` 테이블.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_state_from_row(row: &PgRow) -> StoreResult<JobState> {
    let last_status: Option<String> = row.try_get("last_status")?;

    Ok(JobState {
        name: row.try_get("name")?,
        schedule: row.try_get("schedule")?,
        disabled: row.try_get("disabled")?,
        paused: row.try_get("paused")?,
        locked_at: row.try_get("locked_at")?,
        lock_owner: row.try_get("lock_owner")?,
        last_run_at: row.try_get("last_run_at")?,
        last_finished_at: row.try_get("last_finished_at")?,
        last_status: last_status.as_deref().and_then(JobStatus::parse),
        last_error: row.try_get("last_error")?,
        run_count: row.try_get("run_count")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn ensure(&self, name: &str, schedule: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_jobs (name, schedule)
            VALUES ($1, $2)
            ON CONFLICT (name)
            DO UPDATE SET schedule = EXCLUDED.schedule, updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(schedule)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, name: &str) -> StoreResult<Option<JobState>> {
        let row = sqlx::query(
            r#"
            SELECT name, schedule, disabled, paused, locked_at, lock_owner,
                   last_run_at, last_finished_at, last_status, last_error, run_count
            FROM sync_jobs
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_state_from_row).transpose()
    }

    async fn try_acquire(
        &self,
        name: &str,
        lock_timeout: Option<Duration>,
    ) -> StoreResult<Option<Uuid>> {
        let owner = Uuid::new_v4();

        // 조건부 UPDATE 한 문장으로 검사와 잠금을 동시에 처리
        let acquired = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET disabled = TRUE,
                locked_at = NOW(),
                lock_owner = $3,
                last_run_at = NOW(),
                run_count = run_count + 1,
                updated_at = NOW()
            WHERE name = $1
              AND paused = FALSE
              AND (
                disabled = FALSE
                OR (
                    $2::float8 IS NOT NULL
                    AND locked_at IS NOT NULL
                    AND locked_at < NOW() - ($2::float8 * INTERVAL '1 second')
                )
              )
            RETURNING name
            "#,
        )
        .bind(name)
        .bind(lock_timeout.map(|t| t.as_secs_f64()))
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(acquired.map(|_| owner))
    }

    async fn release(
        &self,
        name: &str,
        owner: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET disabled = FALSE,
                locked_at = NULL,
                lock_owner = NULL,
                last_finished_at = NOW(),
                last_status = $3,
                last_error = $4,
                updated_at = NOW()
            WHERE name = $1 AND lock_owner = $2
            "#,
        )
        .bind(name)
        .bind(owner)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_paused(&self, name: &str, paused: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET paused = $2, updated_at = NOW()
            WHERE name = $1
            "#,
        )
        .bind(name)
        .bind(paused)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn rearm(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET paused = FALSE,
                disabled = FALSE,
                locked_at = NULL,
                lock_owner = NULL,
                updated_at = NOW()
            WHERE name = $1
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
