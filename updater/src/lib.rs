use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use ytmusic::YtMusic;

use crate::updater::SnapshotWriter;

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;
pub mod ranking;
pub mod rest;
pub mod updater;

pub use config::{Config, StoreConfig};
pub use error::UpdateError;
pub use updater::{RankingTier, UpdateRequest, UpdateSummary};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopTrack {
    pub id: String,
    pub name: String,
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub image_url: Option<String>,
    pub play_count: u32,
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopArtist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub popularity: u32, // occurrence count in the fetched history
}

/// Stored alongside each snapshot as `raw_data`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub history_fetched_count: usize,
    pub calculated_artists_count: usize,
    pub calculated_tracks_count: usize,
}

const DEFAULT_LOG_FILTER: &str = "ytm_updater=info,ytm_setup=info,ytm_inspect=info,ytmusic=info";

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();
}

/// One full update for `user_id`: resolve credentials, fetch, rank, write.
pub async fn run(
    config: &Config,
    user_id: &str,
    tier: RankingTier,
) -> Result<UpdateSummary, UpdateError> {
    tracing::info!(
        "starting youtube music update for user {} ({:?} tier, top {})",
        user_id,
        tier,
        tier.limit()
    );

    // Neither writer connects before its first write.
    let writer: Box<dyn SnapshotWriter + Send + Sync> = match &config.store {
        StoreConfig::Postgres { database_url } => Box::new(
            db::PgSnapshotWriter::connect_lazy(database_url)
                .map_err(|e| UpdateError::Configuration(format!("{:#}", e)))?,
        ),
        StoreConfig::Rest { url, service_key } => {
            Box::new(rest::RestSnapshotWriter::new(url, service_key))
        }
    };

    if !ytmusic::oauth::credentials_exist(&config.oauth_file) {
        tracing::error!(
            "credential file {} not found",
            config.oauth_file.display()
        );
        return Err(UpdateError::Authentication(
            ytmusic::Error::MissingCredentials(config.oauth_file.display().to_string()),
        ));
    }

    tracing::info!(
        "initializing client with credentials from {}",
        config.oauth_file.display()
    );
    let client = YtMusic::from_token_file(&config.oauth_file, config.oauth_client.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("failed to initialize client: {}", e);
            UpdateError::Authentication(e)
        })?;
    tracing::info!("client initialized");

    let request = UpdateRequest {
        user_id,
        tier,
        history_limit: config.history_limit,
    };

    updater::update_snapshot(&client, writer.as_ref(), &request, Utc::now()).await
}
