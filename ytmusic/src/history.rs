use chrono::Utc;
use serde_json::Value;
use std::path::Path;

use crate::oauth::{self, OAuthClient, StoredToken};
use crate::{AlbumRef, ArtistRef, Error, PlayEvent, Result, Thumbnail};

static YT_API_BASE_URL: &str = "https://music.youtube.com/youtubei/v1";
static YT_ORIGIN: &str = "https://music.youtube.com";
static USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

const HISTORY_BROWSE_ID: &str = "FEmusic_history";
const DELETED_TITLE: &str = "Song deleted";

/// Authenticated client for the YouTube Music web API.
pub struct YtMusic {
    http: reqwest::Client,
    token: StoredToken,
}

impl YtMusic {
    pub fn new(http: reqwest::Client, token: StoredToken) -> Self {
        Self { http, token }
    }

    /// Builds a client from the credential file, refreshing the access token
    /// first when it is about to expire. A refreshed token is written back.
    pub async fn from_token_file(path: &Path, client: Option<&OAuthClient>) -> Result<Self> {
        let http = reqwest::Client::new();
        let mut token = StoredToken::load(path).await?;

        if token.is_expiring(Utc::now().timestamp()) {
            let client = client.ok_or(Error::TokenExpired)?;
            token = oauth::refresh_token(&http, client, &token).await?;
            token.save(path).await?;
            tracing::info!("refreshed access token, saved to {}", path.display());
        }

        Ok(Self::new(http, token))
    }

    /// Fetches up to `limit` history entries, most recent first.
    pub async fn get_history(&self, limit: usize) -> Result<Vec<PlayEvent>> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "WEB_REMIX",
                    "clientVersion": client_version(),
                    "hl": "en",
                },
                "user": {},
            },
            "browseId": HISTORY_BROWSE_ID,
        });

        let response = self.browse(&body).await?;
        let mut events = parse_history(&response)?;
        events.truncate(limit);

        tracing::debug!("parsed {} history entries", events.len());
        Ok(events)
    }

    async fn browse(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/browse?alt=json&prettyPrint=false", YT_API_BASE_URL);

        tracing::debug!("making authenticated request to {}", url);
        let response = self
            .http
            .post(&url)
            .header(
                "Authorization",
                format!("{} {}", self.token.token_type, self.token.access_token),
            )
            .header("User-Agent", USER_AGENT)
            .header("X-Origin", YT_ORIGIN)
            .header("X-Goog-AuthUser", "0")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!("received response status: {}", status);

        match status {
            401 => Err(Error::Unauthorized),
            400..=599 => Err(Error::HttpRequestFailed(
                status,
                response.text().await.unwrap_or_default(),
            )),
            _ => Ok(response.json::<Value>().await?),
        }
    }
}

fn client_version() -> String {
    format!("1.{}.01.00", Utc::now().format("%Y%m%d"))
}

/// Extracts play events from a `FEmusic_history` browse response, keeping the
/// order of the shelves and of the items inside them.
pub fn parse_history(response: &Value) -> Result<Vec<PlayEvent>> {
    let sections = response
        .pointer("/contents/singleColumnBrowseResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("history section list not found".to_string()))?;

    let mut events = Vec::new();

    for section in sections {
        if let Some(shelf) = section.get("musicShelfRenderer") {
            let played = run_text(shelf.pointer("/title/runs/0"));
            let items = shelf
                .get("contents")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for item in items {
                if let Some(mut event) = item
                    .get("musicResponsiveListItemRenderer")
                    .and_then(parse_list_item)
                {
                    event.played = played.clone();
                    events.push(event);
                }
            }
        } else if let Some(notifier) = section.get("musicNotifierShelfRenderer") {
            let message = run_text(notifier.pointer("/title/runs/0"))
                .unwrap_or_else(|| "history is not available".to_string());
            return Err(Error::HistoryUnavailable(message));
        }
    }

    Ok(events)
}

fn run_text(run: Option<&Value>) -> Option<String> {
    run.and_then(|r| r.get("text"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn run_browse_id(run: &Value) -> Option<String> {
    run.pointer("/navigationEndpoint/browseEndpoint/browseId")
        .and_then(Value::as_str)
        .map(String::from)
}

fn flex_runs(data: &Value, column: usize) -> &[Value] {
    data.pointer(&format!(
        "/flexColumns/{}/musicResponsiveListItemFlexColumnRenderer/text/runs",
        column
    ))
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default()
}

fn parse_list_item(data: &Value) -> Option<PlayEvent> {
    let title = run_text(flex_runs(data, 0).first());
    if title.as_deref() == Some(DELETED_TITLE) {
        return None;
    }

    let video_id = data
        .pointer("/playlistItemData/videoId")
        .or_else(|| {
            data.pointer("/overlay/musicItemThumbnailOverlayRenderer/content/musicPlayButtonRenderer/playNavigationEndpoint/watchEndpoint/videoId")
        })
        .and_then(Value::as_str)
        .map(String::from);

    let album = flex_runs(data, 2).first().and_then(|run| {
        run_text(Some(run)).map(|name| AlbumRef {
            id: run_browse_id(run),
            name: Some(name),
        })
    });

    let thumbnails = data
        .pointer("/thumbnail/musicThumbnailRenderer/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .map(|thumbs| {
            thumbs
                .iter()
                .filter_map(|t| serde_json::from_value::<Thumbnail>(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let duration = run_text(data.pointer(
        "/fixedColumns/0/musicResponsiveListItemFixedColumnRenderer/text/runs/0",
    ));

    Some(PlayEvent {
        video_id,
        title,
        artists: parse_artist_runs(flex_runs(data, 1)),
        album,
        thumbnails,
        played: None,
        duration,
    })
}

/// Artist runs alternate name and separator ("A", " & ", "B", ", ", "C").
/// A " • " separator starts trailing metadata such as view counts.
fn parse_artist_runs(runs: &[Value]) -> Vec<ArtistRef> {
    let mut artists = Vec::new();

    for (i, run) in runs.iter().enumerate() {
        let text = run.get("text").and_then(Value::as_str);
        if i % 2 == 1 {
            if text.map(str::trim) == Some("•") {
                break;
            }
            continue;
        }
        artists.push(ArtistRef {
            id: run_browse_id(run),
            name: text.map(String::from),
        });
    }

    artists
}
