//! Google OAuth handling for the "TVs and limited input devices" client type:
//! the credential file, token refresh and the device authorization flow.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::{Error, Result};

const DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Tokens with less than this many seconds left are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Contents of the credential file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredToken {
    pub fn is_expiring(&self, now: i64) -> bool {
        self.expires_at - now < EXPIRY_MARGIN_SECS
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingCredentials(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    fn from_response(
        response: TokenResponse,
        previous_refresh_token: Option<&str>,
        now: i64,
    ) -> Result<Self> {
        response.check()?;

        let access_token = response
            .access_token
            .ok_or_else(|| Error::OAuth("token response without access_token".to_string()))?;
        // refresh responses do not repeat the refresh token
        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh_token.map(String::from))
            .ok_or_else(|| Error::OAuth("token response without refresh_token".to_string()))?;
        let expires_in = response.expires_in.unwrap_or(0);

        Ok(StoredToken {
            access_token,
            refresh_token,
            scope: response.scope.unwrap_or_else(|| SCOPE.to_string()),
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expires_in,
            expires_at: now + expires_in,
        })
    }
}

/// Readiness check: does a credential file exist at `path`.
pub fn credentials_exist(path: &Path) -> bool {
    path.is_file()
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn describe(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => format!("{}: {}", error, description),
            (Some(error), None) => error.clone(),
            _ => "unknown error".to_string(),
        }
    }

    fn check(&self) -> Result<()> {
        match self.error.as_deref() {
            None => Ok(()),
            Some("invalid_grant") => Err(Error::InvalidGrant(self.describe())),
            Some(_) => Err(Error::OAuth(self.describe())),
        }
    }
}

async fn post_token(http: &reqwest::Client, form: &[(&str, &str)]) -> Result<TokenResponse> {
    // error payloads come back as JSON with a non-2xx status
    let response = http.post(TOKEN_URL).form(form).send().await?;
    Ok(response.json::<TokenResponse>().await?)
}

pub async fn refresh_token(
    http: &reqwest::Client,
    client: &OAuthClient,
    token: &StoredToken,
) -> Result<StoredToken> {
    tracing::debug!("refreshing access token");

    let response = post_token(
        http,
        &[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ],
    )
    .await?;

    StoredToken::from_response(
        response,
        Some(&token.refresh_token),
        Utc::now().timestamp(),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

pub async fn request_device_code(
    http: &reqwest::Client,
    client: &OAuthClient,
) -> Result<DeviceCode> {
    let response = http
        .post(DEVICE_CODE_URL)
        .form(&[("client_id", client.client_id.as_str()), ("scope", SCOPE)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::HttpRequestFailed(status.as_u16(), body));
    }

    Ok(response.json().await?)
}

/// Polls the token endpoint until the user approves the device code.
pub async fn poll_device_token(
    http: &reqwest::Client,
    client: &OAuthClient,
    code: &DeviceCode,
) -> Result<StoredToken> {
    let deadline = Instant::now() + Duration::from_secs(code.expires_in);
    let mut interval = code.interval.max(1);

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        if Instant::now() >= deadline {
            return Err(Error::DeviceCodeExpired);
        }

        let response = post_token(
            http,
            &[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("code", code.device_code.as_str()),
                ("grant_type", DEVICE_GRANT_TYPE),
            ],
        )
        .await?;

        match response.error.as_deref() {
            Some("authorization_pending") => {
                tracing::debug!("authorization pending");
            }
            Some("slow_down") => {
                interval += 5;
                tracing::debug!("slowing down polling to every {}s", interval);
            }
            Some("expired_token") => return Err(Error::DeviceCodeExpired),
            _ => return StoredToken::from_response(response, None, Utc::now().timestamp()),
        }
    }
}
