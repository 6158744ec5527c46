use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{Diagnostics, TopArtist, TopTrack};

pub const SERVICE_ID: &str = "youtubemusic";

/// One `user_streaming_data` row as written by an update. Field names match
/// the table columns so the row serializes directly for the REST endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub user_id: String,
    pub service_id: String,
    pub snapshot_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub top_artists: Vec<TopArtist>,
    pub top_tracks: Vec<TopTrack>,
    pub raw_data: Diagnostics,
}

impl SnapshotRow {
    pub fn new(
        user_id: &str,
        now: DateTime<Utc>,
        top_artists: Vec<TopArtist>,
        top_tracks: Vec<TopTrack>,
        history_fetched_count: usize,
    ) -> Self {
        let raw_data = Diagnostics {
            history_fetched_count,
            calculated_artists_count: top_artists.len(),
            calculated_tracks_count: top_tracks.len(),
        };

        SnapshotRow {
            user_id: user_id.to_string(),
            service_id: SERVICE_ID.to_string(),
            snapshot_date: now.date_naive(),
            last_updated: now,
            top_artists,
            top_tracks,
            raw_data,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredSnapshot {
    pub user_id: String,
    pub service_id: String,
    pub snapshot_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub top_artists: serde_json::Value,
    pub top_tracks: serde_json::Value,
    pub top_genres: Option<serde_json::Value>,
    pub raw_data: serde_json::Value,
}

impl StoredSnapshot {
    pub fn artists(&self) -> serde_json::Result<Vec<TopArtist>> {
        serde_json::from_value(self.top_artists.clone())
    }

    pub fn tracks(&self) -> serde_json::Result<Vec<TopTrack>> {
        serde_json::from_value(self.top_tracks.clone())
    }

    pub fn diagnostics(&self) -> Option<Diagnostics> {
        serde_json::from_value(self.raw_data.clone()).ok()
    }
}
