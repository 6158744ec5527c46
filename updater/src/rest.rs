use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::models::SnapshotRow;
use crate::updater::SnapshotWriter;

const TABLE: &str = "user_streaming_data";
const CONFLICT_COLUMNS: &str = "user_id,service_id,snapshot_date";

/// Writes snapshots through the hosted store's REST endpoint using its
/// merge-duplicates upsert.
pub struct RestSnapshotWriter {
    client: Client,
    base_url: String,
    service_key: String,
}

impl RestSnapshotWriter {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn upsert_url(&self) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url, TABLE, CONFLICT_COLUMNS
        )
    }
}

#[async_trait]
impl SnapshotWriter for RestSnapshotWriter {
    async fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<()> {
        let url = self.upsert_url();
        tracing::debug!("posting snapshot to {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("upsert rejected: {} - {}", status, body);
        }

        Ok(())
    }
}
