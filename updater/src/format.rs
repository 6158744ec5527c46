//! Conversion of ranked history entries into the stored snapshot schema.

use ytmusic::{ArtistRef, PlayEvent};

use crate::ranking::Ranked;
use crate::{TopArtist, TopTrack};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const ARTIST_ID_PREFIX: &str = "ytm-artist-";
const WATCH_URL: &str = "https://music.youtube.com/watch?v=";

pub fn format_track(ranked: &Ranked<&PlayEvent>) -> TopTrack {
    let event = ranked.item;
    let id = event.video_id.clone().unwrap_or_default();

    TopTrack {
        uri: format!("{}{}", WATCH_URL, id),
        name: event
            .title
            .clone()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        artist_names: event
            .artists
            .iter()
            .map(|a| a.name.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string()))
            .collect(),
        album_name: event
            .album
            .as_ref()
            .and_then(|album| album.name.clone())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        image_url: event.thumbnails.first().map(|t| t.url.clone()),
        play_count: ranked.count,
        id,
    }
}

/// Genres and images are not part of the history feed and stay empty.
pub fn format_artist(ranked: &Ranked<&ArtistRef>) -> TopArtist {
    let artist = ranked.item;
    let name = artist
        .name
        .clone()
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    TopArtist {
        id: artist
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| derived_artist_id(&name)),
        name,
        genres: Vec::new(),
        image_url: None,
        popularity: ranked.count,
    }
}

/// Stable id for artists the feed gives no channel id for, built from the
/// display name: alphanumerics and spaces kept, spaces as dashes, lowercased.
pub fn derived_artist_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .replace(' ', "-")
        .to_lowercase();

    if slug.is_empty() {
        format!("{}unknown", ARTIST_ID_PREFIX)
    } else {
        format!("{}{}", ARTIST_ID_PREFIX, slug)
    }
}
