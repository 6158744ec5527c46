use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPool;
use ytm_updater::models::StoredSnapshot;
use ytm_updater::{db, StoreConfig};

#[derive(Parser)]
#[command(name = "ytm-inspect")]
#[command(about = "Inspect stored YouTube Music snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the bundled migrations
    Migrate,

    /// Show one snapshot
    Show {
        user_id: String,

        /// Snapshot date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List every stored snapshot for a user, newest first
    List { user_id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    ytm_updater::init_tracing();

    let cli = Cli::parse();

    let database_url = match StoreConfig::from_env()? {
        StoreConfig::Postgres { database_url } => database_url,
        StoreConfig::Rest { .. } => {
            bail!("ytm-inspect needs DATABASE_URL, the REST store can't be inspected")
        }
    };

    let pool = db::init_db(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Migrate => {
            println!("migrations applied");
        }
        Commands::Show { user_id, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            show_snapshot(&pool, &user_id, date).await?;
        }
        Commands::List { user_id } => {
            list_snapshots(&pool, &user_id).await?;
        }
    }

    Ok(())
}

async fn show_snapshot(pool: &PgPool, user_id: &str, date: NaiveDate) -> Result<()> {
    let Some(snapshot) = db::get_snapshot(pool, user_id, date).await? else {
        println!("no snapshot found for {} on {}", user_id, date);
        return Ok(());
    };

    println!("snapshot for {} on {}:", snapshot.user_id, snapshot.snapshot_date);
    println!("  service: {}", snapshot.service_id);
    println!("  last updated: {}", snapshot.last_updated);
    print_diagnostics(&snapshot);

    match snapshot.tracks() {
        Ok(tracks) => {
            println!("\ntop {} tracks:", tracks.len());
            for (i, track) in tracks.iter().enumerate() {
                println!(
                    "  {}. {} - {} ({} plays)",
                    i + 1,
                    track.name,
                    track.artist_names.join(", "),
                    track.play_count
                );
                println!("     album: {}", track.album_name);
                println!("     {}", track.uri);
            }
        }
        Err(e) => {
            println!("\ntop tracks (unreadable: {}):", e);
            println!("  {}", snapshot.top_tracks);
        }
    }

    match snapshot.artists() {
        Ok(artists) => {
            println!("\ntop {} artists:", artists.len());
            for (i, artist) in artists.iter().enumerate() {
                println!(
                    "  {}. {} - {} plays ({})",
                    i + 1,
                    artist.name,
                    artist.popularity,
                    artist.id
                );
            }
        }
        Err(e) => {
            println!("\ntop artists (unreadable: {}):", e);
            println!("  {}", snapshot.top_artists);
        }
    }

    Ok(())
}

async fn list_snapshots(pool: &PgPool, user_id: &str) -> Result<()> {
    let snapshots = db::list_snapshots(pool, user_id).await?;

    if snapshots.is_empty() {
        println!("no snapshots found for {}", user_id);
        return Ok(());
    }

    println!("snapshots for {}:", user_id);
    for snapshot in &snapshots {
        println!(
            "  {} - {} tracks, {} artists (updated {})",
            snapshot.snapshot_date,
            list_len(snapshot.tracks()),
            list_len(snapshot.artists()),
            snapshot.last_updated
        );
    }

    Ok(())
}

fn list_len<T>(list: serde_json::Result<Vec<T>>) -> String {
    match list {
        Ok(items) => items.len().to_string(),
        Err(_) => "unreadable".to_string(),
    }
}

fn print_diagnostics(snapshot: &StoredSnapshot) {
    match snapshot.diagnostics() {
        Some(d) => {
            println!("  history items fetched: {}", d.history_fetched_count);
            println!("  tracks calculated: {}", d.calculated_tracks_count);
            println!("  artists calculated: {}", d.calculated_artists_count);
        }
        None => println!("  diagnostics: {}", snapshot.raw_data),
    }
}
