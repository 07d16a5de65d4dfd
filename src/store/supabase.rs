//! Supabase (PostgREST) record store.
//!
//! Expects a table with `id uuid primary key, filename text, text text`.

use super::{ExtractionRecord, RecordStore, StoredRecord};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    service_role_key: String,
    schema: String,
    table: String,
}

/// Row shape returned by PostgREST.
#[derive(Debug, Deserialize)]
struct FileRow {
    id: serde_json::Value,
    filename: Option<String>,
    text: Option<String>,
}

impl From<FileRow> for StoredRecord {
    fn from(row: FileRow) -> Self {
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        StoredRecord {
            id,
            filename: row.filename.unwrap_or_default(),
            text: row.text.unwrap_or_default(),
        }
    }
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        service_role_key: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait::async_trait]
impl RecordStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn insert_one(&self, record: &ExtractionRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let body = json!({
            "id": id,
            "filename": record.filename,
            "text": record.text,
        });

        debug!("Inserting record {} for {}", id, record.filename);

        let resp = self
            .client
            .post(self.table_url())
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
            .header("Content-Profile", &self.schema)
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Failed to insert record for {}: {} - {}",
                record.filename,
                status,
                text
            ));
        }

        Ok(id)
    }

    async fn find_all(&self) -> Result<Vec<StoredRecord>> {
        let url = format!("{}?select=id,filename,text", self.table_url());
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Accept-Profile", &self.schema)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase GET {} failed: {} - {}", self.table, status, text));
        }

        let rows: Vec<FileRow> = resp.json().await?;
        debug!("Fetched {} records from {}", rows.len(), self.table);
        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }
}
