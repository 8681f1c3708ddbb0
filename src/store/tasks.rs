//! Task rows and embedded notes.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::errors::{CoreError, CoreResult};
use crate::types::{Priority, Task, TaskNote, TaskStatus};

use super::Store;

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status_str: String = row.get("status")?;
    let priority_str: String = row.get("priority")?;
    Ok(Task {
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        assigned_to: row.get("assigned_to")?,
        created_by: row.get("created_by")?,
        status: TaskStatus::parse(&status_str).unwrap_or(TaskStatus::Pending),
        priority: Priority::parse(&priority_str).unwrap_or(Priority::Medium),
        parent_task: row.get("parent_task")?,
        notes: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_notes(conn: &rusqlite::Connection, task_id: &str) -> rusqlite::Result<Vec<TaskNote>> {
    let mut stmt = conn.prepare(
        "SELECT ts, author, content FROM task_notes WHERE task_id = ?1 ORDER BY id",
    )?;
    stmt.query_map(params![task_id], |row| {
        Ok(TaskNote {
            ts: row.get(0)?,
            author: row.get(1)?,
            content: row.get(2)?,
        })
    })?
    .collect()
}

impl Store {
    pub async fn create_task(&self, task: Task) -> CoreResult<Task> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO tasks (task_id, title, description, assigned_to, created_by,
                     status, priority, parent_task, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    task.task_id,
                    task.title,
                    task.description,
                    task.assigned_to,
                    task.created_by,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.parent_task,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
            Ok(task)
        })
        .await
    }

    pub async fn get_task(&self, task_id: &str) -> CoreResult<Option<Task>> {
        let task_id = task_id.to_string();
        self.run(move |conn| {
            let task = conn
                .query_row(
                    "SELECT * FROM tasks WHERE task_id = ?1",
                    params![task_id],
                    row_to_task,
                )
                .optional()?;
            match task {
                Some(mut t) => {
                    t.notes = load_notes(conn, &t.task_id)?;
                    Ok(Some(t))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// Every ancestor id reachable via `parent_task`, used to reject cycles
    /// before a parent link is written.
    pub async fn ancestor_chain(&self, task_id: &str) -> CoreResult<Vec<String>> {
        let task_id = task_id.to_string();
        self.run(move |conn| {
            let mut chain = Vec::new();
            let mut current = task_id;
            loop {
                let parent: Option<String> = conn
                    .query_row(
                        "SELECT parent_task FROM tasks WHERE task_id = ?1",
                        params![current],
                        |row| row.get(0),
                    )
                    .optional()?
                    .flatten();
                match parent {
                    Some(p) if !chain.contains(&p) => {
                        chain.push(p.clone());
                        current = p;
                    }
                    _ => break,
                }
            }
            Ok(chain)
        })
        .await
    }

    pub async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> CoreResult<()> {
        let task_id = task_id.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE task_id = ?3",
                params![status.as_str(), now, task_id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("task {task_id}")));
            }
            Ok(())
        })
        .await
    }

    pub async fn assign_task(&self, task_id: &str, agent_id: Option<&str>) -> CoreResult<()> {
        let task_id = task_id.to_string();
        let agent_id = agent_id.map(crate::types::canonical_admin_id);
        let now = Utc::now();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET assigned_to = ?1, updated_at = ?2 WHERE task_id = ?3",
                params![agent_id, now, task_id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(format!("task {task_id}")));
            }
            Ok(())
        })
        .await
    }

    pub async fn append_task_note(
        &self,
        task_id: &str,
        author: &str,
        content: &str,
    ) -> CoreResult<()> {
        let task_id = task_id.to_string();
        let author = author.to_string();
        let content = content.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM tasks WHERE task_id = ?1",
                    params![task_id],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !exists {
                return Err(CoreError::NotFound(format!("task {task_id}")));
            }
            conn.execute(
                "INSERT INTO task_notes (task_id, ts, author, content) VALUES (?1, ?2, ?3, ?4)",
                params![task_id, now, author, content],
            )?;
            conn.execute(
                "UPDATE tasks SET updated_at = ?1 WHERE task_id = ?2",
                params![now, task_id],
            )?;
            Ok(())
        })
        .await
    }

    /// Every task assigned to this agent, plus every task it has recorded
    /// an action against (e.g. the testing agent that audited it), so an
    /// agent's task list reflects work it did as well as work it owns.
    pub async fn list_tasks_for_agent(&self, agent_id: &str) -> CoreResult<Vec<Task>> {
        let agent_id = crate::types::canonical_admin_id(agent_id);
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE assigned_to = ?1
                 UNION
                 SELECT t.* FROM tasks t
                 JOIN agent_actions a ON a.task_id = t.task_id
                 WHERE a.agent_id = ?1
                 ORDER BY created_at",
            )?;
            let mut tasks = stmt
                .query_map(params![agent_id], row_to_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for t in &mut tasks {
                t.notes = load_notes(conn, &t.task_id)?;
            }
            Ok(tasks)
        })
        .await
    }

    pub async fn list_subtasks(&self, parent_task_id: &str) -> CoreResult<Vec<Task>> {
        let parent_task_id = parent_task_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE parent_task = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map(params![parent_task_id], row_to_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    pub async fn list_all_tasks(&self) -> CoreResult<Vec<Task>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY created_at")?;
            let rows = stmt
                .query_map([], row_to_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: &str, parent: Option<&str>) -> Task {
        let now = Utc::now();
        Task {
            task_id: id.to_string(),
            title: "do the thing".to_string(),
            description: "details".to_string(),
            assigned_to: None,
            created_by: "admin".to_string(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            parent_task: parent.map(|s| s.to_string()),
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_and_append_note_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.create_task(sample_task("t1", None)).await.unwrap();
        store
            .append_task_note("t1", "agent-1", "started work")
            .await
            .unwrap();
        let task = store.get_task("t1").await.unwrap().unwrap();
        assert_eq!(task.notes.len(), 1);
        assert_eq!(task.notes[0].content, "started work");
    }

    #[tokio::test]
    async fn ancestor_chain_follows_parent_links() {
        let store = Store::open_in_memory().unwrap();
        store.create_task(sample_task("root", None)).await.unwrap();
        store
            .create_task(sample_task("child", Some("root")))
            .await
            .unwrap();
        store
            .create_task(sample_task("grandchild", Some("child")))
            .await
            .unwrap();
        let chain = store.ancestor_chain("grandchild").await.unwrap();
        assert_eq!(chain, vec!["child".to_string(), "root".to_string()]);
    }

    #[tokio::test]
    async fn note_on_missing_task_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .append_task_note("ghost", "x", "y")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ErrNotFound");
    }
}
