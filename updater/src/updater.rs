use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ytmusic::{PlayEvent, YtMusic};

use crate::format::{format_artist, format_track};
use crate::models::SnapshotRow;
use crate::ranking::{rank_artists, rank_tracks};
use crate::UpdateError;

/// Supplies listening history, most recent first.
#[async_trait]
pub trait HistorySource {
    async fn fetch_history(&self, limit: usize) -> anyhow::Result<Vec<PlayEvent>>;
}

#[async_trait]
impl HistorySource for YtMusic {
    async fn fetch_history(&self, limit: usize) -> anyhow::Result<Vec<PlayEvent>> {
        Ok(self.get_history(limit).await?)
    }
}

/// Persists a snapshot, replacing any row with the same key.
#[async_trait]
pub trait SnapshotWriter {
    async fn upsert_snapshot(&self, row: &SnapshotRow) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingTier {
    #[default]
    Standard,
    Elevated,
}

impl RankingTier {
    pub fn from_premium(premium: bool) -> Self {
        if premium {
            RankingTier::Elevated
        } else {
            RankingTier::Standard
        }
    }

    /// How many tracks and artists a snapshot keeps.
    pub fn limit(self) -> usize {
        match self {
            RankingTier::Standard => 3,
            RankingTier::Elevated => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateRequest<'a> {
    pub user_id: &'a str,
    pub tier: RankingTier,
    pub history_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub snapshot_date: NaiveDate,
    pub history_fetched_count: usize,
    pub calculated_tracks_count: usize,
    pub calculated_artists_count: usize,
}

/// Ranks and formats `events` into the row for `user_id` at `now`.
pub fn build_snapshot(
    user_id: &str,
    events: &[PlayEvent],
    limit: usize,
    now: DateTime<Utc>,
) -> SnapshotRow {
    let top_tracks = rank_tracks(events, limit)
        .iter()
        .map(format_track)
        .collect();
    let top_artists = rank_artists(events, limit)
        .iter()
        .map(format_artist)
        .collect();

    SnapshotRow::new(user_id, now, top_artists, top_tracks, events.len())
}

/// Fetch, rank, format and upsert. A failed fetch writes nothing; an empty
/// history still writes an empty snapshot.
pub async fn update_snapshot<S, W>(
    source: &S,
    writer: &W,
    request: &UpdateRequest<'_>,
    now: DateTime<Utc>,
) -> Result<UpdateSummary, UpdateError>
where
    S: HistorySource + ?Sized,
    W: SnapshotWriter + ?Sized,
{
    tracing::info!("fetching last {} history items...", request.history_limit);
    let events = source
        .fetch_history(request.history_limit)
        .await
        .map_err(|e| {
            tracing::error!("failed to fetch history for {}: {:#}", request.user_id, e);
            UpdateError::Fetch(e)
        })?;

    if events.is_empty() {
        tracing::warn!("no history items found, writing an empty snapshot");
    } else {
        tracing::info!("fetched {} history items", events.len());
    }

    let limit = request.tier.limit();
    tracing::info!("calculating top {} tracks and artists...", limit);
    let row = build_snapshot(request.user_id, &events, limit, now);
    tracing::info!(
        "top {} tracks and {} artists calculated",
        row.top_tracks.len(),
        row.top_artists.len()
    );

    tracing::info!(
        "upserting snapshot for {} on {}...",
        row.user_id,
        row.snapshot_date
    );
    writer.upsert_snapshot(&row).await.map_err(|e| {
        tracing::error!("failed to write snapshot for {}: {:#}", row.user_id, e);
        UpdateError::Write(e)
    })?;

    Ok(UpdateSummary {
        snapshot_date: row.snapshot_date,
        history_fetched_count: row.raw_data.history_fetched_count,
        calculated_tracks_count: row.raw_data.calculated_tracks_count,
        calculated_artists_count: row.raw_data.calculated_artists_count,
    })
}
