//! Minimal YouTube Music client: OAuth credential handling and listening
//! history retrieval through the innertube API used by the web player.

use serde::{Deserialize, Serialize};

pub mod history;
pub mod oauth;

pub use history::{parse_history, YtMusic};
pub use oauth::{OAuthClient, StoredToken};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The access token was rejected
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request failed (error {0}): {1}")]
    HttpRequestFailed(u16, String),
    /// The OAuth server answered with an error code other than `invalid_grant`
    #[error("OAuth error: {0}")]
    OAuth(String),
    /// The refresh token was revoked or expired
    #[error("OAuth grant is invalid or expired: {0}")]
    InvalidGrant(String),
    #[error("No stored credentials at {0}")]
    MissingCredentials(String),
    #[error("Access token expired and no OAuth client is configured to refresh it")]
    TokenExpired,
    #[error("Device code expired before authorization completed")]
    DeviceCodeExpired,
    /// History shelf replaced by a notice, e.g. when watch history is paused
    #[error("History unavailable: {0}")]
    HistoryUnavailable(String),
    #[error("Unexpected response shape: {0}")]
    Parse(String),
}

impl Error {
    /// Whether retrying with fresh credentials could fix this failure.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized
                | Error::InvalidGrant(_)
                | Error::MissingCredentials(_)
                | Error::TokenExpired
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// One play from the listening history. Histories are ordered most recent
/// first, so an event's index is its recency rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub video_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    /// Shelf label the play was listed under ("Today", "Yesterday", ...)
    pub played: Option<String>,
    pub duration: Option<String>,
}
