use thiserror::Error;

/// Every variant ends the run. Nothing is retried.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(#[source] ytmusic::Error),

    /// Displays the full cause chain and has no separate source.
    #[error("failed to fetch listening history: {0:#}")]
    Fetch(anyhow::Error),

    #[error("failed to write snapshot: {0:#}")]
    Write(anyhow::Error),
}

impl UpdateError {
    pub fn phase(&self) -> &'static str {
        match self {
            UpdateError::Configuration(_) => "configuration",
            UpdateError::Authentication(_) => "authentication",
            UpdateError::Fetch(_) => "fetch",
            UpdateError::Write(_) => "write",
        }
    }

    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            UpdateError::Authentication(ytmusic::Error::MissingCredentials(_)) => {
                Some("run ytm-setup to create the credential file, then re-run the update")
            }
            UpdateError::Authentication(
                ytmusic::Error::InvalidGrant(_)
                | ytmusic::Error::TokenExpired
                | ytmusic::Error::Unauthorized,
            ) => Some(
                "the OAuth token might be expired or revoked; remove the credential file and run ytm-setup again",
            ),
            UpdateError::Authentication(_) => Some(
                "check the credential file and the OAuth client settings, or re-run ytm-setup --force",
            ),
            UpdateError::Fetch(e)
                if e.downcast_ref::<ytmusic::Error>()
                    .is_some_and(ytmusic::Error::is_auth) =>
            {
                Some("authentication might have failed; check the credential file and the OAuth client settings")
            }
            _ => None,
        }
    }
}
