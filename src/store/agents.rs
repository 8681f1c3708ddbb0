//! Agent rows.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;

use crate::errors::{CoreError, CoreResult};
use crate::types::{Agent, AgentStatus};

use super::Store;

fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
    let caps_json: String = row.get("capabilities")?;
    let capabilities: HashSet<String> = serde_json::from_str(&caps_json).unwrap_or_default();
    let status_str: String = row.get("status")?;
    Ok(Agent {
        agent_id: row.get("agent_id")?,
        token: row.get("token")?,
        capabilities,
        status: AgentStatus::parse(&status_str).unwrap_or(AgentStatus::Created),
        current_task: row.get("current_task")?,
        working_directory: row.get("working_directory")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        terminated_at: row.get("terminated_at")?,
    })
}

impl Store {
    pub async fn create_agent(&self, agent: Agent) -> CoreResult<Agent> {
        self.run(move |conn| {
            let caps_json = serde_json::to_string(&agent.capabilities)
                .map_err(|e| CoreError::Internal(e.to_string()))?;
            conn.execute(
                "INSERT INTO agents (agent_id, token, capabilities, status, current_task,
                     working_directory, color, created_at, updated_at, terminated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    agent.agent_id,
                    agent.token,
                    caps_json,
                    agent.status.as_str(),
                    agent.current_task,
                    agent.working_directory,
                    agent.color,
                    agent.created_at,
                    agent.updated_at,
                    agent.terminated_at,
                ],
            )?;
            Ok(agent)
        })
        .await
    }

    pub async fn get_agent(&self, agent_id: &str) -> CoreResult<Option<Agent>> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM agents WHERE agent_id = ?1",
                params![agent_id],
                row_to_agent,
            )
            .optional()
            .map_err(CoreError::from)
        })
        .await
    }

    pub async fn get_agent_by_token(&self, token: &str) -> CoreResult<Option<Agent>> {
        let token = token.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT * FROM agents WHERE token = ?1",
                params![token],
                row_to_agent,
            )
            .optional()
            .map_err(CoreError::from)
        })
        .await
    }

    pub async fn list_agents(&self) -> CoreResult<Vec<Agent>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM agents ORDER BY created_at")?;
            let rows = stmt
                .query_map([], row_to_agent)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    pub async fn set_agent_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> CoreResult<()> {
        let agent_id = agent_id.to_string();
        let now = Utc::now();
        let terminated_at = matches!(status, AgentStatus::Terminated).then_some(now);
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE agents SET status = ?1, updated_at = ?2, terminated_at = COALESCE(?3, terminated_at)
                 WHERE agent_id = ?4",
                params![status.as_str(), now, terminated_at, agent_id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("agent {agent_id}")));
            }
            Ok(())
        })
        .await
    }

    /// Removes an agent row outright, used when a deterministic agent id
    /// (e.g. a testing agent) is about to be recreated from scratch rather
    /// than left around in a terminated state.
    pub async fn delete_agent(&self, agent_id: &str) -> CoreResult<()> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM agents WHERE agent_id = ?1", params![agent_id])?;
            Ok(())
        })
        .await
    }

    pub async fn assign_task_to_agent(
        &self,
        agent_id: &str,
        task_id: Option<&str>,
    ) -> CoreResult<()> {
        let agent_id = agent_id.to_string();
        let task_id = task_id.map(|s| s.to_string());
        let now = Utc::now();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE agents SET current_task = ?1, updated_at = ?2 WHERE agent_id = ?3",
                params![task_id, now, agent_id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("agent {agent_id}")));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Agent;

    fn sample_agent(id: &str) -> Agent {
        let now = Utc::now();
        Agent {
            agent_id: id.to_string(),
            token: format!("tok-{id}"),
            capabilities: HashSet::from(["code".to_string()]),
            status: AgentStatus::Created,
            current_task: None,
            working_directory: "/work".to_string(),
            color: "blue".to_string(),
            created_at: now,
            updated_at: now,
            terminated_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        use pretty_assertions::assert_eq;

        let store = Store::open_in_memory().unwrap();
        let created = sample_agent("a1");
        store.create_agent(created.clone()).await.unwrap();
        let fetched = store.get_agent("a1").await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn set_status_to_terminated_stamps_terminated_at() {
        let store = Store::open_in_memory().unwrap();
        store.create_agent(sample_agent("a1")).await.unwrap();
        store
            .set_agent_status("a1", AgentStatus::Terminated)
            .await
            .unwrap();
        let fetched = store.get_agent("a1").await.unwrap().unwrap();
        assert_eq!(fetched.status, AgentStatus::Terminated);
        assert!(fetched.terminated_at.is_some());
    }

    #[tokio::test]
    async fn set_status_on_missing_agent_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .set_agent_status("ghost", AgentStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ErrNotFound");
    }

    #[tokio::test]
    async fn deleted_agent_id_can_be_recreated() {
        let store = Store::open_in_memory().unwrap();
        store.create_agent(sample_agent("a1")).await.unwrap();
        store.delete_agent("a1").await.unwrap();
        assert!(store.get_agent("a1").await.unwrap().is_none());
        store.create_agent(sample_agent("a1")).await.unwrap();
        assert!(store.get_agent("a1").await.unwrap().is_some());
    }
}
