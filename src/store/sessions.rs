//! MCP session persistence and per-agent session state.
//!
//! The disconnect/recover/expire state machine lives here as plain SQL
//! transitions; the policy around it (heartbeat cadence, the 10-minute
//! grace window, the 3-attempt recovery cap) is owned by
//! `session_manager`, which calls these as primitives.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

use crate::errors::{CoreError, CoreResult};
use crate::types::{McpSessionRow, McpSessionStatus, SessionState};

use super::Store;

pub const GRACE_PERIOD_MINUTES: i64 = 10;
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<McpSessionRow> {
    let transport_json: String = row.get("transport_state")?;
    let metadata_json: String = row.get("metadata")?;
    let status_str: String = row.get("status")?;
    let agent_context_json: Option<String> = row.get("agent_context")?;
    let conversation_json: Option<String> = row.get("conversation_state")?;
    Ok(McpSessionRow {
        mcp_session_id: row.get("mcp_session_id")?,
        transport_state: serde_json::from_str(&transport_json).unwrap_or(serde_json::Value::Null),
        created_at: row.get("created_at")?,
        last_heartbeat: row.get("last_heartbeat")?,
        status: McpSessionStatus::parse(&status_str).unwrap_or(McpSessionStatus::Active),
        disconnected_at: row.get("disconnected_at")?,
        grace_period_expires: row.get("grace_period_expires")?,
        recovery_attempts: row.get::<_, i64>("recovery_attempts")? as u32,
        working_directory: row.get("working_directory")?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
        agent_context: agent_context_json
            .map(|s| serde_json::from_str(&s).unwrap_or(serde_json::Value::Null)),
        conversation_state: conversation_json
            .map(|s| serde_json::from_str(&s).unwrap_or(serde_json::Value::Null)),
    })
}

impl Store {
    pub async fn init_session(
        &self,
        mcp_session_id: &str,
        working_directory: &str,
        metadata: serde_json::Value,
    ) -> CoreResult<()> {
        let mcp_session_id = mcp_session_id.to_string();
        let working_directory = working_directory.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let metadata_json = serde_json::to_string(&metadata).unwrap_or_default();
            conn.execute(
                "INSERT INTO mcp_session_persistence
                     (mcp_session_id, transport_state, created_at, last_heartbeat, status,
                      recovery_attempts, working_directory, metadata)
                 VALUES (?1, '{}', ?2, ?2, ?3, 0, ?4, ?5)",
                params![
                    mcp_session_id,
                    now,
                    McpSessionStatus::Active.as_str(),
                    working_directory,
                    metadata_json,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, mcp_session_id: &str) -> CoreResult<Option<McpSessionRow>> {
        let mcp_session_id = mcp_session_id.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM mcp_session_persistence WHERE mcp_session_id = ?1",
                params![mcp_session_id],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    pub async fn list_sessions(&self) -> CoreResult<Vec<McpSessionRow>> {
        self.run(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM mcp_session_persistence ORDER BY created_at")?;
            let rows = stmt
                .query_map([], row_to_session)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    pub async fn update_heartbeat(&self, mcp_session_id: &str) -> CoreResult<()> {
        let mcp_session_id = mcp_session_id.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE mcp_session_persistence SET last_heartbeat = ?1 WHERE mcp_session_id = ?2",
                params![now, mcp_session_id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("session {mcp_session_id}")));
            }
            Ok(())
        })
        .await
    }

    pub async fn mark_disconnected(&self, mcp_session_id: &str) -> CoreResult<DateTime<Utc>> {
        let mcp_session_id = mcp_session_id.to_string();
        let now = Utc::now();
        let grace_expires = now + Duration::minutes(GRACE_PERIOD_MINUTES);
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE mcp_session_persistence
                 SET status = ?1, disconnected_at = ?2, grace_period_expires = ?3
                 WHERE mcp_session_id = ?4 AND status != ?5",
                params![
                    McpSessionStatus::Disconnected.as_str(),
                    now,
                    grace_expires,
                    mcp_session_id,
                    McpSessionStatus::Expired.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("session {mcp_session_id}")));
            }
            Ok(grace_expires)
        })
        .await
    }

    /// Attempts recovery. Denies with `ErrRecoveryDenied` if the grace
    /// window has lapsed or the attempt cap is exhausted.
    pub async fn try_recover(&self, mcp_session_id: &str) -> CoreResult<McpSessionRow> {
        let mcp_session_id = mcp_session_id.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let session = conn
                .query_row(
                    "SELECT * FROM mcp_session_persistence WHERE mcp_session_id = ?1",
                    params![mcp_session_id],
                    row_to_session,
                )
                .optional()?
                .ok_or_else(|| CoreError::NotFound(format!("session {mcp_session_id}")))?;

            if session.status != McpSessionStatus::Disconnected {
                return Err(CoreError::RecoveryDenied(format!(
                    "session {mcp_session_id} is not disconnected"
                )));
            }
            if session.recovery_attempts >= MAX_RECOVERY_ATTEMPTS {
                return Err(CoreError::RecoveryDenied(format!(
                    "session {mcp_session_id} exhausted its {MAX_RECOVERY_ATTEMPTS} recovery attempts"
                )));
            }
            match session.grace_period_expires {
                Some(expires) if now > expires => {
                    return Err(CoreError::RecoveryDenied(format!(
                        "session {mcp_session_id} grace period has expired"
                    )));
                }
                None => {
                    return Err(CoreError::Internal(format!(
                        "disconnected session {mcp_session_id} has no grace_period_expires"
                    )));
                }
                _ => {}
            }

            conn.execute(
                "UPDATE mcp_session_persistence
                 SET status = ?1, recovery_attempts = recovery_attempts + 1,
                     disconnected_at = NULL, grace_period_expires = NULL, last_heartbeat = ?2
                 WHERE mcp_session_id = ?3",
                params![McpSessionStatus::Recovered.as_str(), now, mcp_session_id],
            )?;

            conn.query_row(
                "SELECT * FROM mcp_session_persistence WHERE mcp_session_id = ?1",
                params![mcp_session_id],
                row_to_session,
            )
            .map_err(Into::into)
        })
        .await
    }

    /// Marks every disconnected session whose grace window has lapsed as
    /// expired. Returns the ids that were swept.
    pub async fn expire_past_grace(&self) -> CoreResult<Vec<String>> {
        let now = Utc::now();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT mcp_session_id FROM mcp_session_persistence
                 WHERE status = ?1 AND grace_period_expires IS NOT NULL AND grace_period_expires < ?2",
            )?;
            let ids = stmt
                .query_map(
                    params![McpSessionStatus::Disconnected.as_str(), now],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            conn.execute(
                "UPDATE mcp_session_persistence SET status = ?1
                 WHERE status = ?2 AND grace_period_expires IS NOT NULL AND grace_period_expires < ?3",
                params![McpSessionStatus::Expired.as_str(), McpSessionStatus::Disconnected.as_str(), now],
            )?;
            Ok(ids)
        })
        .await
    }

    pub async fn set_session_state(
        &self,
        agent_id: &str,
        mcp_session_id: &str,
        state_key: &str,
        state_value: serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> CoreResult<()> {
        let agent_id = agent_id.to_string();
        let mcp_session_id = mcp_session_id.to_string();
        let state_key = state_key.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let value_json = serde_json::to_string(&state_value).unwrap_or_default();
            conn.execute(
                "INSERT INTO session_agent_state
                     (agent_id, mcp_session_id, state_key, state_value, last_updated, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(agent_id, mcp_session_id, state_key) DO UPDATE SET
                     state_value = excluded.state_value,
                     last_updated = excluded.last_updated,
                     expires_at = excluded.expires_at",
                params![agent_id, mcp_session_id, state_key, value_json, now, expires_at],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session_state(
        &self,
        agent_id: &str,
        mcp_session_id: &str,
        state_key: &str,
    ) -> CoreResult<Option<SessionState>> {
        let agent_id = agent_id.to_string();
        let mcp_session_id = mcp_session_id.to_string();
        let state_key = state_key.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM session_agent_state
                 WHERE agent_id = ?1 AND mcp_session_id = ?2 AND state_key = ?3",
                params![agent_id, mcp_session_id, state_key],
                |row| {
                    let value_json: String = row.get("state_value")?;
                    Ok(SessionState {
                        agent_id: row.get("agent_id")?,
                        mcp_session_id: row.get("mcp_session_id")?,
                        state_key: row.get("state_key")?,
                        state_value: serde_json::from_str(&value_json)
                            .unwrap_or(serde_json::Value::Null),
                        last_updated: row.get("last_updated")?,
                        expires_at: row.get("expires_at")?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recover_within_grace_window_succeeds() {
        let store = Store::open_in_memory().unwrap();
        store
            .init_session("sess-1", "/work", json!({}))
            .await
            .unwrap();
        store.mark_disconnected("sess-1").await.unwrap();
        let recovered = store.try_recover("sess-1").await.unwrap();
        assert_eq!(recovered.status, McpSessionStatus::Recovered);
        assert_eq!(recovered.recovery_attempts, 1);
    }

    #[tokio::test]
    async fn recover_denied_after_attempts_exhausted() {
        let store = Store::open_in_memory().unwrap();
        store
            .init_session("sess-1", "/work", json!({}))
            .await
            .unwrap();
        for _ in 0..MAX_RECOVERY_ATTEMPTS {
            store.mark_disconnected("sess-1").await.unwrap();
            store.try_recover("sess-1").await.unwrap();
        }
        store.mark_disconnected("sess-1").await.unwrap();
        let err = store.try_recover("sess-1").await.unwrap_err();
        assert_eq!(err.kind(), "ErrRecoveryDenied");
    }

    #[tokio::test]
    async fn session_state_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store
            .set_session_state("agent-1", "sess-1", "scratch", json!({"k": 1}), None)
            .await
            .unwrap();
        let state = store
            .get_session_state("agent-1", "sess-1", "scratch")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.state_value, json!({"k": 1}));
    }
}
