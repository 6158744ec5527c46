use clap::Parser;
use std::process::ExitCode;
use ytm_updater::{Config, RankingTier};

#[derive(Parser)]
#[command(name = "ytm-updater")]
#[command(about = "Update a user's daily YouTube Music top tracks and artists snapshot", long_about = None)]
struct Cli {
    /// Store user id to update
    #[arg(value_name = "USER_ID")]
    user_id: String,

    /// Premium user: keep the top 5 tracks and artists instead of the top 3
    #[arg(long)]
    premium: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    ytm_updater::init_tracing();

    let cli = Cli::parse();
    let tier = RankingTier::from_premium(cli.premium);

    let result = match Config::from_env() {
        Ok(config) => ytm_updater::run(&config, &cli.user_id, tier).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            tracing::info!(
                "successfully updated snapshot for user {} on {} ({} history items, {} tracks, {} artists)",
                cli.user_id,
                summary.snapshot_date,
                summary.history_fetched_count,
                summary.calculated_tracks_count,
                summary.calculated_artists_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("update failed during {}: {}", e.phase(), e);
            if let Some(hint) = e.remediation() {
                tracing::warn!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
