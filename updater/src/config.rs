use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::str::FromStr;
use ytmusic::OAuthClient;

use crate::UpdateError;

pub const DEFAULT_OAUTH_FILE: &str = "oauth.json";
pub const DEFAULT_HISTORY_LIMIT: usize = 150;

/// Where snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Direct Postgres connection
    Postgres { database_url: String },
    /// Hosted store REST endpoint authenticated with a service key
    Rest { url: String, service_key: String },
}

/// Settings for one run, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub oauth_client: Option<OAuthClient>,
    pub oauth_file: PathBuf,
    pub history_limit: usize,
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl Config {
    pub fn from_env() -> Result<Self, UpdateError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, UpdateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let history_limit = match non_empty(&lookup, "YTM_HISTORY_LIMIT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(UpdateError::Configuration(format!(
                        "YTM_HISTORY_LIMIT must be a positive integer, got {:?}",
                        raw
                    )))
                }
            },
            None => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Config {
            store: StoreConfig::from_lookup(&lookup)?,
            oauth_client: oauth_client_from_lookup(&lookup)?,
            oauth_file: oauth_file_from_lookup(&lookup),
            history_limit,
        })
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, UpdateError> {
        Self::from_lookup(&env_lookup)
    }

    /// `DATABASE_URL` wins over the REST endpoint when both are set.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, UpdateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database_url) = non_empty(lookup, "DATABASE_URL") {
            PgConnectOptions::from_str(&database_url).map_err(|e| {
                UpdateError::Configuration(format!("invalid DATABASE_URL: {}", e))
            })?;
            return Ok(StoreConfig::Postgres { database_url });
        }

        match (
            non_empty(lookup, "SUPABASE_URL"),
            non_empty(lookup, "SUPABASE_SERVICE_KEY"),
        ) {
            (Some(url), Some(service_key)) => Ok(StoreConfig::Rest { url, service_key }),
            _ => Err(UpdateError::Configuration(
                "either DATABASE_URL or both SUPABASE_URL and SUPABASE_SERVICE_KEY must be set"
                    .to_string(),
            )),
        }
    }
}

pub fn oauth_client_from_env() -> Result<Option<OAuthClient>, UpdateError> {
    oauth_client_from_lookup(&env_lookup)
}

/// The client id and secret must be set together.
pub fn oauth_client_from_lookup<F>(lookup: &F) -> Result<Option<OAuthClient>, UpdateError>
where
    F: Fn(&str) -> Option<String>,
{
    match (
        non_empty(lookup, "YTM_OAUTH_CLIENT_ID"),
        non_empty(lookup, "YTM_OAUTH_CLIENT_SECRET"),
    ) {
        (Some(client_id), Some(client_secret)) => Ok(Some(OAuthClient {
            client_id,
            client_secret,
        })),
        (None, None) => Ok(None),
        _ => Err(UpdateError::Configuration(
            "YTM_OAUTH_CLIENT_ID and YTM_OAUTH_CLIENT_SECRET must be set together".to_string(),
        )),
    }
}

pub fn oauth_file_from_env() -> PathBuf {
    oauth_file_from_lookup(&env_lookup)
}

pub fn oauth_file_from_lookup<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, "YTM_OAUTH_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OAUTH_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn postgres_store_with_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/ytm")]))
            .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/ytm".into()
            }
        );
        assert_eq!(config.oauth_client, None);
        assert_eq!(config.oauth_file, PathBuf::from(DEFAULT_OAUTH_FILE));
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn rest_store_and_oauth_client() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_KEY", "service-key"),
            ("YTM_OAUTH_CLIENT_ID", "id.apps.googleusercontent.com"),
            ("YTM_OAUTH_CLIENT_SECRET", "secret"),
            ("YTM_OAUTH_FILE", "/var/lib/ytm/oauth.json"),
            ("YTM_HISTORY_LIMIT", "50"),
        ]))
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Rest {
                url: "https://project.supabase.co".into(),
                service_key: "service-key".into()
            }
        );
        assert_eq!(
            config.oauth_client,
            Some(OAuthClient {
                client_id: "id.apps.googleusercontent.com".into(),
                client_secret: "secret".into()
            })
        );
        assert_eq!(config.oauth_file, PathBuf::from("/var/lib/ytm/oauth.json"));
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn database_url_wins_over_rest() {
        let store = StoreConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_KEY", "key"),
        ]))
        .unwrap();
        assert!(matches!(store, StoreConfig::Postgres { .. }));
    }

    #[test]
    fn malformed_database_url_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "not a url")])).unwrap_err();
        assert_eq!(err.phase(), "configuration");
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn missing_store_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Configuration(_)));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, UpdateError::Configuration(_)));
    }

    #[test]
    fn half_configured_oauth_client_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("YTM_OAUTH_CLIENT_ID", "id"),
        ]))
        .unwrap_err();
        assert!(matches!(err, UpdateError::Configuration(ref m) if m.contains("together")));
    }

    #[test]
    fn invalid_history_limit_is_rejected() {
        for raw in ["0", "-3", "many"] {
            let err = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://db"),
                ("YTM_HISTORY_LIMIT", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, UpdateError::Configuration(_)), "{}", raw);
        }
    }
}
