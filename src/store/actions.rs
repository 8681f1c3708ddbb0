//! Append-only agent action log.

use chrono::Utc;
use rusqlite::params;

use crate::errors::CoreResult;
use crate::types::AgentAction;

use super::Store;

impl Store {
    pub async fn record_action(
        &self,
        agent_id: &str,
        action_type: &str,
        task_id: Option<&str>,
        details: serde_json::Value,
    ) -> CoreResult<i64> {
        let agent_id = agent_id.to_string();
        let action_type = action_type.to_string();
        let task_id = task_id.map(|s| s.to_string());
        let now = Utc::now();
        self.run(move |conn| {
            let details_json = serde_json::to_string(&details).unwrap_or_default();
            conn.execute(
                "INSERT INTO agent_actions (agent_id, action_type, task_id, timestamp, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![agent_id, action_type, task_id, now, details_json],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn list_actions_for_agent(&self, agent_id: &str) -> CoreResult<Vec<AgentAction>> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM agent_actions WHERE agent_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![agent_id], |row| {
                    let details_json: String = row.get("details")?;
                    Ok(AgentAction {
                        id: row.get("id")?,
                        agent_id: row.get("agent_id")?,
                        action_type: row.get("action_type")?,
                        task_id: row.get("task_id")?,
                        timestamp: row.get("timestamp")?,
                        details: serde_json::from_str(&details_json)
                            .unwrap_or(serde_json::Value::Null),
                    })
                })?
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
    async fn recorded_actions_are_queryable_in_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .record_action("agent-1", "started", None, json!({}))
            .await
            .unwrap();
        store
            .record_action("agent-1", "finished", Some("t1"), json!({"ok": true}))
            .await
            .unwrap();
        let actions = store.list_actions_for_agent("agent-1").await.unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].action_type, "finished");
    }
}
