//! Agent/task lifecycle orchestration.
//!
//! `Supervisor` is the one place that knows how to keep the `Store`, the
//! `AuthIndex`, and live tmux sessions in sync with each other; tool
//! handlers never touch tmux or the auth index directly.

pub mod testing_pipeline;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{self, AuthIndex};
use crate::errors::{CoreError, CoreResult};
use crate::store::Store;
use crate::tmux::{self, TmuxOps};
use crate::types::{Agent, AgentStatus, Priority, Task, TaskStatus};

/// Gives the external agent runtime time to finish its own startup before
/// the initial prompt is typed into its pane.
const INITIAL_PROMPT_DELAY: Duration = Duration::from_secs(2);

pub struct Supervisor {
    store: Store,
    tmux: Arc<dyn TmuxOps>,
    auth: Arc<AuthIndex>,
    server_url: String,
}

impl Supervisor {
    pub fn new(store: Store, tmux: Arc<dyn TmuxOps>, auth: Arc<AuthIndex>, server_url: String) -> Arc<Self> {
        Arc::new(Self { store, tmux, auth, server_url })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tmux(&self) -> &Arc<dyn TmuxOps> {
        &self.tmux
    }

    pub async fn create_agent(
        &self,
        agent_id: &str,
        working_directory: &str,
        capabilities: Vec<String>,
        color: String,
    ) -> CoreResult<Agent> {
        self.create_agent_with_prompt(agent_id, working_directory, capabilities, color, None)
            .await
    }

    /// Creates an agent, boots its tmux session with its identity in the
    /// environment, and — if `initial_prompt` is given — types it into the
    /// session a couple seconds later as two separate operations
    /// (keystrokes, then a submit keypress), detached from this call.
    pub async fn create_agent_with_prompt(
        &self,
        agent_id: &str,
        working_directory: &str,
        capabilities: Vec<String>,
        color: String,
        initial_prompt: Option<String>,
    ) -> CoreResult<Agent> {
        if self.store.get_agent(agent_id).await?.is_some() {
            return Err(CoreError::Conflict(format!("agent {agent_id} already exists")));
        }
        let token = auth::generate_token();
        let now = Utc::now();
        let agent = Agent {
            agent_id: agent_id.to_string(),
            token: token.clone(),
            capabilities: capabilities.into_iter().collect::<HashSet<_>>(),
            status: AgentStatus::Created,
            current_task: None,
            working_directory: working_directory.to_string(),
            color,
            created_at: now,
            updated_at: now,
            terminated_at: None,
        };

        let session = tmux::session_name(agent_id, &token);
        let env = vec![
            ("FLEETD_AGENT_ID".to_string(), agent_id.to_string()),
            ("FLEETD_AGENT_TOKEN".to_string(), token.clone()),
            ("FLEETD_SERVER_URL".to_string(), self.server_url.clone()),
            ("FLEETD_WORKING_DIRECTORY".to_string(), working_directory.to_string()),
        ];
        self.tmux
            .create_session(&session, working_directory, &env)
            .await
            .map_err(CoreError::from)?;

        let created = self.store.create_agent(agent).await?;
        self.auth.insert(&created.agent_id, &created.token);
        self.store
            .set_agent_status(&created.agent_id, AgentStatus::Active)
            .await?;
        self.store
            .record_action(&created.agent_id, "create_agent", None, serde_json::json!({}))
            .await?;

        if let Some(prompt) = initial_prompt {
            let tmux = self.tmux.clone();
            let session = session.clone();
            let agent_id = created.agent_id.clone();
            tokio::spawn(async move {
                sleep(INITIAL_PROMPT_DELAY).await;
                if let Err(e) = tmux.send_keys(&session, &prompt, false).await {
                    warn!(agent_id, error = %e, "failed to type initial prompt");
                    return;
                }
                if let Err(e) = tmux.send_keys(&session, "", true).await {
                    warn!(agent_id, error = %e, "failed to submit initial prompt");
                }
            });
        }

        Ok(Agent {
            status: AgentStatus::Active,
            ..created
        })
    }

    pub async fn terminate_agent(&self, agent_id: &str) -> CoreResult<()> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("agent {agent_id}")))?;
        let session = tmux::session_name(agent_id, &agent.token);
        match self.tmux.kill_session(&session).await {
            Ok(()) | Err(crate::tmux::TmuxError::SessionNotFound(_)) => {}
            Err(e) => return Err(CoreError::from(e)),
        }
        self.store
            .set_agent_status(agent_id, AgentStatus::Terminated)
            .await?;
        self.auth.remove_agent(agent_id);
        self.store
            .record_action(agent_id, "agent_terminated", None, serde_json::json!({}))
            .await?;
        Ok(())
    }

    pub async fn create_task(
        &self,
        title: String,
        description: String,
        created_by: String,
        priority: Priority,
        assigned_to: Option<String>,
        parent_task: Option<String>,
    ) -> CoreResult<Task> {
        if let Some(parent) = &parent_task {
            if self.store.get_task(parent).await?.is_none() {
                return Err(CoreError::NotFound(format!("parent task {parent}")));
            }
        }
        let assigned_to = assigned_to.map(|a| crate::types::canonical_admin_id(&a));
        let now = Utc::now();
        let task = Task {
            task_id: Uuid::new_v4().to_string(),
            title,
            description,
            assigned_to: assigned_to.clone(),
            created_by,
            status: TaskStatus::Pending,
            priority,
            parent_task,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let created = self.store.create_task(task).await?;
        if let Some(agent_id) = &assigned_to {
            if agent_id != "admin" {
                self.store
                    .assign_task_to_agent(agent_id, Some(&created.task_id))
                    .await?;
            }
        }
        Ok(created)
    }

    /// Reassigns an existing task's parent, rejecting any change that
    /// would introduce a cycle.
    pub async fn reparent_task(&self, task_id: &str, new_parent: Option<&str>) -> CoreResult<()> {
        if let Some(parent) = new_parent {
            if parent == task_id {
                return Err(CoreError::Validation("a task cannot be its own parent".into()));
            }
            let ancestors = self.store.ancestor_chain(parent).await?;
            if ancestors.contains(&task_id.to_string()) {
                return Err(CoreError::Validation(format!(
                    "reparenting {task_id} under {parent} would introduce a cycle"
                )));
            }
        }
        self.store
            .run({
                let task_id = task_id.to_string();
                let new_parent = new_parent.map(str::to_string);
                move |conn| {
                    let changed = conn.execute(
                        "UPDATE tasks SET parent_task = ?1 WHERE task_id = ?2",
                        rusqlite::params![new_parent, task_id],
                    )?;
                    if changed == 0 {
                        return Err(CoreError::NotFound(format!("task {task_id}")));
                    }
                    Ok(())
                }
            })
            .await
    }

    pub async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> CoreResult<()> {
        self.store.update_task_status(task_id, status).await?;
        if status == TaskStatus::Completed {
            testing_pipeline::on_task_completed(self, task_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::MockTmuxOps;

    fn supervisor_with(mock: MockTmuxOps) -> Arc<Supervisor> {
        Supervisor::new(
            Store::open_in_memory().unwrap(),
            Arc::new(mock),
            Arc::new(AuthIndex::new()),
            "http://127.0.0.1:7878".to_string(),
        )
    }

    #[tokio::test]
    async fn create_agent_activates_and_indexes_token() {
        let mut mock = MockTmuxOps::new();
        mock.expect_create_session().returning(|_, _, _| Ok(()));
        let supervisor = supervisor_with(mock);

        let agent = supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap();

        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(
            supervisor.store().get_agent_by_token(&agent.token).await.unwrap().unwrap().agent_id,
            "agent-alpha"
        );
    }

    #[tokio::test]
    async fn create_agent_rejects_duplicate_id() {
        let mut mock = MockTmuxOps::new();
        mock.expect_create_session().returning(|_, _, _| Ok(()));
        let supervisor = supervisor_with(mock);

        supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap();
        let err = supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_agent_propagates_tmux_failure_without_persisting() {
        let mut mock = MockTmuxOps::new();
        mock.expect_create_session()
            .returning(|_, _, _| Err(crate::tmux::TmuxError::NotFound));
        let supervisor = supervisor_with(mock);

        let err = supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Subprocess(_)));
        assert!(supervisor.store().get_agent("agent-alpha").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminate_agent_tolerates_already_vanished_session() {
        let mut mock = MockTmuxOps::new();
        mock.expect_create_session().returning(|_, _, _| Ok(()));
        mock.expect_kill_session()
            .returning(|name| Err(crate::tmux::TmuxError::SessionNotFound(name.to_string())));
        let supervisor = supervisor_with(mock);

        supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap();
        supervisor.terminate_agent("agent-alpha").await.unwrap();

        let agent = supervisor.store().get_agent("agent-alpha").await.unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Terminated);
    }

    #[tokio::test]
    async fn create_task_rejects_missing_parent() {
        let supervisor = supervisor_with(MockTmuxOps::new());
        let err = supervisor
            .create_task(
                "t".into(),
                "d".into(),
                "admin".into(),
                Priority::Low,
                None,
                Some("does-not-exist".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn reparent_task_rejects_self_parenting() {
        let supervisor = supervisor_with(MockTmuxOps::new());
        let task = supervisor
            .create_task("t".into(), "d".into(), "admin".into(), Priority::Low, None, None)
            .await
            .unwrap();
        let err = supervisor
            .reparent_task(&task.task_id, Some(&task.task_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn reparent_task_rejects_cycles() {
        let supervisor = supervisor_with(MockTmuxOps::new());
        let parent = supervisor
            .create_task("parent".into(), "d".into(), "admin".into(), Priority::Low, None, None)
            .await
            .unwrap();
        let child = supervisor
            .create_task(
                "child".into(),
                "d".into(),
                "admin".into(),
                Priority::Low,
                None,
                Some(parent.task_id.clone()),
            )
            .await
            .unwrap();

        let err = supervisor
            .reparent_task(&parent.task_id, Some(&child.task_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
