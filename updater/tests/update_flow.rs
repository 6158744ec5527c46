use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Mutex;
use ytm_updater::models::SnapshotRow;
use ytm_updater::updater::{update_snapshot, HistorySource, SnapshotWriter};
use ytm_updater::{Diagnostics, RankingTier, UpdateError, UpdateRequest};
use ytmusic::{AlbumRef, ArtistRef, PlayEvent, Thumbnail};

struct FakeHistory {
    events: Option<Vec<PlayEvent>>,
    requested: Mutex<Vec<usize>>,
}

impl FakeHistory {
    fn with(events: Vec<PlayEvent>) -> Self {
        Self {
            events: Some(events),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            events: None,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn fetch_history(&self, limit: usize) -> anyhow::Result<Vec<PlayEvent>> {
        self.requested.lock().unwrap().push(limit);
        match &self.events {
            Some(events) => Ok(events.iter().take(limit).cloned().collect()),
            None => Err(ytmusic::Error::HistoryUnavailable("history is paused".into()).into()),
        }
    }
}

/// Keyed like the real table, so a second write for the same day replaces
/// the first.
#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<SnapshotRow>>,
    reject: bool,
}

#[async_trait]
impl SnapshotWriter for MemoryStore {
    async fn upsert_snapshot(&self, row: &SnapshotRow) -> anyhow::Result<()> {
        if self.reject {
            return Err(anyhow!("upsert rejected: 401 Unauthorized"));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|r| {
            (&r.user_id, &r.service_id, r.snapshot_date)
                != (&row.user_id, &row.service_id, row.snapshot_date)
        });
        rows.push(row.clone());
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
}

fn request(tier: RankingTier) -> UpdateRequest<'static> {
    UpdateRequest {
        user_id: "user-1",
        tier,
        history_limit: 150,
    }
}

fn play(video_id: &str, title: &str, artists: &[&str]) -> PlayEvent {
    PlayEvent {
        video_id: Some(video_id.to_string()),
        title: Some(title.to_string()),
        artists: artists
            .iter()
            .map(|name| ArtistRef {
                id: None,
                name: Some(name.to_string()),
            })
            .collect(),
        album: Some(AlbumRef {
            id: None,
            name: Some(format!("{} album", title)),
        }),
        thumbnails: vec![Thumbnail {
            url: format!("https://i.ytimg.com/{}.jpg", video_id),
            width: 60,
            height: 60,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn writes_ranked_snapshot() {
    let source = FakeHistory::with(vec![
        play("v1", "one", &["A"]),
        play("v2", "two", &["A"]),
        play("v1", "one", &["A"]),
    ]);
    let store = MemoryStore::default();

    let summary = update_snapshot(&source, &store, &request(RankingTier::Standard), now())
        .await
        .unwrap();

    assert_eq!(summary.snapshot_date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    assert_eq!(summary.history_fetched_count, 3);
    assert_eq!(summary.calculated_tracks_count, 2);
    assert_eq!(summary.calculated_artists_count, 1);
    assert_eq!(*source.requested.lock().unwrap(), vec![150]);

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.user_id, "user-1");
    assert_eq!(row.service_id, "youtubemusic");
    assert_eq!(row.last_updated, now());

    let tracks: Vec<(&str, u32)> = row
        .top_tracks
        .iter()
        .map(|t| (t.id.as_str(), t.play_count))
        .collect();
    assert_eq!(tracks, vec![("v1", 2), ("v2", 1)]);
    assert_eq!(row.top_tracks[0].uri, "https://music.youtube.com/watch?v=v1");
    assert_eq!(row.top_tracks[0].album_name, "one album");
    assert_eq!(
        row.top_tracks[0].image_url.as_deref(),
        Some("https://i.ytimg.com/v1.jpg")
    );

    assert_eq!(row.top_artists.len(), 1);
    assert_eq!(row.top_artists[0].name, "A");
    assert_eq!(row.top_artists[0].id, "ytm-artist-a");
    assert_eq!(row.top_artists[0].popularity, 3);

    assert_eq!(
        row.raw_data,
        Diagnostics {
            history_fetched_count: 3,
            calculated_artists_count: 1,
            calculated_tracks_count: 2,
        }
    );
}

#[tokio::test]
async fn tier_sets_the_list_length() {
    let events: Vec<PlayEvent> = (0..8)
        .map(|i| play(&format!("v{}", i), &format!("t{}", i), &[format!("artist {}", i).as_str()]))
        .collect();
    let store = MemoryStore::default();

    let standard = update_snapshot(
        &FakeHistory::with(events.clone()),
        &store,
        &request(RankingTier::Standard),
        now(),
    )
    .await
    .unwrap();
    assert_eq!(standard.calculated_tracks_count, 3);
    assert_eq!(standard.calculated_artists_count, 3);

    let elevated = update_snapshot(
        &FakeHistory::with(events),
        &store,
        &request(RankingTier::Elevated),
        now(),
    )
    .await
    .unwrap();
    assert_eq!(elevated.calculated_tracks_count, 5);
    assert_eq!(elevated.calculated_artists_count, 5);

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].top_tracks.len(), 5);
    let ids: Vec<&str> = rows[0].top_tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["v0", "v1", "v2", "v3", "v4"]);
}

#[tokio::test]
async fn empty_history_still_writes_an_empty_snapshot() {
    let source = FakeHistory::with(Vec::new());
    let store = MemoryStore::default();

    let summary = update_snapshot(&source, &store, &request(RankingTier::Standard), now())
        .await
        .unwrap();
    assert_eq!(summary.history_fetched_count, 0);

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].top_tracks.is_empty());
    assert!(rows[0].top_artists.is_empty());
    assert_eq!(rows[0].raw_data, Diagnostics::default());
}

#[tokio::test]
async fn failed_fetch_writes_nothing() {
    let source = FakeHistory::failing();
    let store = MemoryStore::default();

    let err = update_snapshot(&source, &store, &request(RankingTier::Standard), now())
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::Fetch(_)));
    assert_eq!(err.phase(), "fetch");
    assert!(err.to_string().contains("history is paused"));
    assert!(store.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_write_is_a_write_error() {
    let source = FakeHistory::with(vec![play("v1", "one", &["A"])]);
    let store = MemoryStore {
        reject: true,
        ..Default::default()
    };

    let err = update_snapshot(&source, &store, &request(RankingTier::Standard), now())
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::Write(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn same_day_rerun_replaces_the_snapshot() {
    let store = MemoryStore::default();

    update_snapshot(
        &FakeHistory::with(vec![play("v1", "one", &["A"])]),
        &store,
        &request(RankingTier::Standard),
        now(),
    )
    .await
    .unwrap();

    let later = now() + chrono::Duration::hours(6);
    update_snapshot(
        &FakeHistory::with(vec![play("v9", "nine", &["B"]), play("v9", "nine", &["B"])]),
        &store,
        &request(RankingTier::Standard),
        later,
    )
    .await
    .unwrap();

    let next_day = now() + chrono::Duration::days(1);
    update_snapshot(
        &FakeHistory::with(vec![play("v2", "two", &["C"])]),
        &store,
        &request(RankingTier::Standard),
        next_day,
    )
    .await
    .unwrap();

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), 2);

    let today = rows
        .iter()
        .find(|r| r.snapshot_date == NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
        .unwrap();
    assert_eq!(today.last_updated, later);
    assert_eq!(today.top_tracks.len(), 1);
    assert_eq!(today.top_tracks[0].id, "v9");
    assert_eq!(today.top_tracks[0].play_count, 2);
}
