//! Shared project context.
//!
//! `archive_context` never deletes: it renames the key to
//! `archived_<key>_<unix_ts>` so history stays queryable, mirroring how the
//! testing pipeline archives a stale answer instead of discarding it.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::errors::CoreResult;
use crate::types::ContextEntry;

use super::Store;

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<ContextEntry> {
    let value_json: String = row.get("value")?;
    Ok(ContextEntry {
        context_key: row.get("context_key")?,
        value: serde_json::from_str(&value_json).unwrap_or(serde_json::Value::Null),
        description: row.get("description")?,
        last_updated: row.get("last_updated")?,
        updated_by: row.get("updated_by")?,
    })
}

impl Store {
    pub async fn upsert_context(
        &self,
        key: &str,
        value: serde_json::Value,
        description: &str,
        updated_by: &str,
    ) -> CoreResult<()> {
        let key = key.to_string();
        let description = description.to_string();
        let updated_by = updated_by.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let value_json = serde_json::to_string(&value).unwrap_or_default();
            conn.execute(
                "INSERT INTO project_context (context_key, value, description, last_updated, updated_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(context_key) DO UPDATE SET
                     value = excluded.value,
                     description = excluded.description,
                     last_updated = excluded.last_updated,
                     updated_by = excluded.updated_by",
                params![key, value_json, description, now, updated_by],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_context(&self, key: &str) -> CoreResult<Option<ContextEntry>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM project_context WHERE context_key = ?1",
                params![key],
                row_to_entry,
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    pub async fn list_context(&self) -> CoreResult<Vec<ContextEntry>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM project_context ORDER BY context_key")?;
            let rows = stmt
                .query_map([], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// Renames `key` to `archived_<key>_<unix_ts>` in place, leaving the
    /// value untouched. Returns the archived key, or `None` if `key` was
    /// never set.
    pub async fn archive_context(&self, key: &str) -> CoreResult<Option<String>> {
        let key = key.to_string();
        self.run(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM project_context WHERE context_key = ?1",
                    params![key],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !exists {
                return Ok(None);
            }
            let archived_key = format!("archived_{key}_{}", Utc::now().timestamp());
            conn.execute(
                "UPDATE project_context SET context_key = ?1 WHERE context_key = ?2",
                params![archived_key, key],
            )?;
            Ok(Some(archived_key))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_then_archive_renames_key() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_context("build_cmd", json!("cargo build"), "how to build", "admin")
            .await
            .unwrap();
        let archived = store.archive_context("build_cmd").await.unwrap().unwrap();
        assert!(archived.starts_with("archived_build_cmd_"));
        assert!(store.get_context("build_cmd").await.unwrap().is_none());
        assert!(store.get_context(&archived).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn archiving_missing_key_returns_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.archive_context("nope").await.unwrap().is_none());
    }
}
