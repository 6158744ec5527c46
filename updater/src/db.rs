use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::{SnapshotRow, StoredSnapshot, SERVICE_ID};
use crate::updater::SnapshotWriter;

/// Connects eagerly and applies the bundled migrations.
pub async fn init_db(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(database_url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Last-write-wins on (user, service, date). `top_genres` is left untouched.
pub async fn upsert_snapshot(pool: &PgPool, row: &SnapshotRow) -> Result<()> {
    let top_artists = serde_json::to_value(&row.top_artists)?;
    let top_tracks = serde_json::to_value(&row.top_tracks)?;
    let raw_data = serde_json::to_value(row.raw_data)?;

    sqlx::query(
        r#"
        INSERT INTO user_streaming_data (
            user_id, service_id, snapshot_date, last_updated,
            top_artists, top_tracks, raw_data
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, service_id, snapshot_date)
        DO UPDATE SET
            last_updated = EXCLUDED.last_updated,
            top_artists = EXCLUDED.top_artists,
            top_tracks = EXCLUDED.top_tracks,
            raw_data = EXCLUDED.raw_data
        "#,
    )
    .bind(&row.user_id)
    .bind(&row.service_id)
    .bind(row.snapshot_date)
    .bind(row.last_updated)
    .bind(top_artists)
    .bind(top_tracks)
    .bind(raw_data)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(
            "failed to upsert snapshot for {} on {}: {}",
            row.user_id,
            row.snapshot_date,
            e
        );
        e
    })?;

    Ok(())
}

pub async fn get_snapshot(
    pool: &PgPool,
    user_id: &str,
    snapshot_date: NaiveDate,
) -> Result<Option<StoredSnapshot>> {
    let snapshot = sqlx::query_as::<_, StoredSnapshot>(
        r#"
        SELECT user_id, service_id, snapshot_date, last_updated,
               top_artists, top_tracks, top_genres, raw_data
        FROM user_streaming_data
        WHERE user_id = $1 AND service_id = $2 AND snapshot_date = $3
        "#,
    )
    .bind(user_id)
    .bind(SERVICE_ID)
    .bind(snapshot_date)
    .fetch_optional(pool)
    .await?;

    Ok(snapshot)
}

/// Newest first.
pub async fn list_snapshots(pool: &PgPool, user_id: &str) -> Result<Vec<StoredSnapshot>> {
    let snapshots = sqlx::query_as::<_, StoredSnapshot>(
        r#"
        SELECT user_id, service_id, snapshot_date, last_updated,
               top_artists, top_tracks, top_genres, raw_data
        FROM user_streaming_data
        WHERE user_id = $1 AND service_id = $2
        ORDER BY snapshot_date DESC
        "#,
    )
    .bind(user_id)
    .bind(SERVICE_ID)
    .fetch_all(pool)
    .await?;

    Ok(snapshots)
}

pub struct PgSnapshotWriter {
    pool: PgPool,
}

impl PgSnapshotWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// No connection is opened until the first write.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_lazy(database_url)
            .context("invalid DATABASE_URL")?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SnapshotWriter for PgSnapshotWriter {
    async fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<()> {
        upsert_snapshot(&self.pool, row).await
    }
}
