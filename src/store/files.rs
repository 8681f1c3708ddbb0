//! File metadata ledger.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::errors::CoreResult;
use crate::types::FileMetadata;

use super::Store;

fn row_to_metadata(row: &rusqlite::Row) -> rusqlite::Result<FileMetadata> {
    let metadata_json: String = row.get("metadata")?;
    Ok(FileMetadata {
        filepath: row.get("filepath")?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
        last_updated: row.get("last_updated")?,
        updated_by: row.get("updated_by")?,
        content_hash: row.get("content_hash")?,
    })
}

impl Store {
    pub async fn upsert_file_metadata(
        &self,
        filepath: &str,
        metadata: serde_json::Value,
        updated_by: &str,
        content_hash: &str,
    ) -> CoreResult<()> {
        let filepath = filepath.to_string();
        let updated_by = updated_by.to_string();
        let content_hash = content_hash.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let metadata_json = serde_json::to_string(&metadata).unwrap_or_default();
            conn.execute(
                "INSERT INTO file_metadata (filepath, metadata, last_updated, updated_by, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(filepath) DO UPDATE SET
                     metadata = excluded.metadata,
                     last_updated = excluded.last_updated,
                     updated_by = excluded.updated_by,
                     content_hash = excluded.content_hash",
                params![filepath, metadata_json, now, updated_by, content_hash],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_file_metadata(&self, filepath: &str) -> CoreResult<Option<FileMetadata>> {
        let filepath = filepath.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM file_metadata WHERE filepath = ?1",
                params![filepath],
                row_to_metadata,
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    pub async fn list_file_metadata(&self) -> CoreResult<Vec<FileMetadata>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM file_metadata ORDER BY filepath")?;
            let rows = stmt
                .query_map([], row_to_metadata)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_is_idempotent_on_filepath() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_file_metadata("src/lib.rs", json!({"lines": 10}), "agent-1", "abc123")
            .await
            .unwrap();
        store
            .upsert_file_metadata("src/lib.rs", json!({"lines": 20}), "agent-1", "def456")
            .await
            .unwrap();
        let all = store.list_file_metadata().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content_hash, "def456");
    }
}
