use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ytm_updater::config;
use ytmusic::oauth;

/// One-time interactive OAuth setup. Writes the credential file the updater
/// reads on every run.
#[derive(Parser)]
#[command(name = "ytm-setup")]
#[command(about = "Authorize YouTube Music access and save the credential file", long_about = None)]
struct Cli {
    /// Credential file to write (defaults to YTM_OAUTH_FILE or oauth.json)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Replace an existing credential file
    #[arg(long)]
    force: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    ytm_updater::init_tracing();

    let cli = Cli::parse();

    let client = config::oauth_client_from_env()?.ok_or_else(|| {
        anyhow!("YTM_OAUTH_CLIENT_ID and YTM_OAUTH_CLIENT_SECRET must be set for setup")
    })?;
    let path = cli.file.unwrap_or_else(config::oauth_file_from_env);

    if oauth::credentials_exist(&path) && !cli.force {
        tracing::info!(
            "credentials already exist at {}, pass --force to replace them",
            path.display()
        );
        return Ok(());
    }

    let http = reqwest::Client::new();
    let code = oauth::request_device_code(&http, &client)
        .await
        .context("Failed to request a device code")?;

    println!();
    println!("open {} and enter the code {}", code.verification_url, code.user_code);
    println!("waiting for authorization (expires in {}s)...", code.expires_in);
    println!();

    let token = oauth::poll_device_token(&http, &client, &code)
        .await
        .context("Device authorization failed")?;

    token
        .save(&path)
        .await
        .with_context(|| format!("Failed to write credentials to {}", path.display()))?;

    tracing::info!("oauth setup complete, credentials saved to {}", path.display());

    Ok(())
}
