//! Testing-agent auto-launch pipeline: every task that
//! transitions to `completed` spins up a dedicated testing agent to
//! validate the work, rather than trusting the completing agent's own
//! say-so.
//!
//! The pipeline is deliberately best-effort past the point the testing
//! task is filed: a tmux hiccup pausing the original agent, or the
//! delayed validation callback, must never turn a real completion into a
//! lost one. Failures there are logged as agent actions, not propagated.

use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::errors::{CoreError, CoreResult};
use crate::types::{Priority, TaskStatus};

use super::Supervisor;

const VALIDATION_DELAY: Duration = Duration::from_secs(15);
const PAUSE_BREAK_COUNT: usize = 4;
const PAUSE_BREAK_SPACING: Duration = Duration::from_secs(1);
const AUDIT_WINDOW: chrono::Duration = chrono::Duration::hours(1);

fn last6(s: &str) -> &str {
    let len = s.len();
    if len <= 6 {
        s
    } else {
        &s[len - 6..]
    }
}

fn testing_agent_id(task_id: &str) -> String {
    format!("test-{}", last6(task_id))
}

fn testing_task_id(task_id: &str) -> String {
    format!("test-{task_id}")
}

/// Entry point called right after a task's status is persisted as
/// `completed`. Spins up (or idempotently reuses) a testing agent, files
/// a testing task against it, and schedules the delayed validation
/// callback.
pub async fn on_task_completed(supervisor: &Supervisor, task_id: &str) -> CoreResult<()> {
    let task = supervisor
        .store()
        .get_task(task_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("task {task_id}")))?;

    let completing_agent_id = task.assigned_to.clone();

    // Best-effort: pause the completing agent's tmux pane so it doesn't
    // keep typing into a session the testing agent is about to read from.
    // Four submit-key breaks spaced a second apart; a failure here never
    // blocks the rest of the pipeline.
    if let Some(agent_id) = &completing_agent_id {
        if let Ok(Some(agent)) = supervisor.store().get_agent(agent_id).await {
            let session = crate::tmux::session_name(agent_id, &agent.token);
            for i in 0..PAUSE_BREAK_COUNT {
                if let Err(e) = supervisor.tmux().send_keys(&session, "", true).await {
                    warn!(agent_id, error = %e, "best-effort pause of completing agent failed");
                    break;
                }
                if i + 1 < PAUSE_BREAK_COUNT {
                    sleep(PAUSE_BREAK_SPACING).await;
                }
            }
        }
    }

    let test_agent_id = testing_agent_id(task_id);
    let test_task_id = testing_task_id(task_id);

    // Idempotent teardown-and-recreate: a task can be re-completed, so a
    // stale testing agent from a prior run is torn down before a fresh
    // one is created.
    if supervisor.store().get_agent(&test_agent_id).await?.is_some() {
        if let Err(e) = supervisor.terminate_agent(&test_agent_id).await {
            warn!(agent_id = %test_agent_id, error = %e, "failed to tear down stale testing agent");
        }
        supervisor.store().delete_agent(&test_agent_id).await?;
    }

    let working_directory = match &completing_agent_id {
        Some(agent_id) => supervisor
            .store()
            .get_agent(agent_id)
            .await?
            .map(|a| a.working_directory)
            .unwrap_or_else(|| ".".to_string()),
        None => ".".to_string(),
    };

    let audit = gather_audit(supervisor, task_id, completing_agent_id.as_deref()).await?;

    let prompt = enriched_validation_prompt(&task.title, &task.description, task_id, &completing_agent_id, &audit);

    let test_agent = supervisor
        .create_agent_with_prompt(
            &test_agent_id,
            &working_directory,
            vec!["testing".to_string(), "validation".to_string(), "criticism".to_string(), "audit".to_string()],
            "yellow".to_string(),
            Some(prompt),
        )
        .await?;

    supervisor
        .store()
        .upsert_context(
            &format!("testing_access_{test_agent_id}"),
            serde_json::json!({
                "permissions": ["read_task", "read_context", "read_file_metadata", "archive_context"],
                "scope": task_id,
            }),
            &format!("access granted to testing agent {test_agent_id} for auditing task {task_id}"),
            "admin",
        )
        .await?;

    supervisor
        .store()
        .run({
            let test_task_id = test_task_id.clone();
            let test_agent_id = test_agent_id.clone();
            let title = format!("validate: {}", task.title);
            let description = format!(
                "verify the work done for task {task_id} ({}):\n\n{}\n\n{audit}",
                task.title, task.description
            );
            let now = chrono::Utc::now();
            move |conn| {
                conn.execute(
                    "INSERT INTO tasks (task_id, title, description, assigned_to, created_by,
                         status, priority, parent_task, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 'admin', ?5, ?6, ?7, ?8, ?8)
                     ON CONFLICT(task_id) DO UPDATE SET
                         title = excluded.title, description = excluded.description,
                         status = excluded.status, updated_at = excluded.updated_at",
                    rusqlite::params![
                        test_task_id,
                        title,
                        description,
                        test_agent_id,
                        TaskStatus::InProgress.as_str(),
                        Priority::High.as_str(),
                        task_id,
                        now,
                    ],
                )?;
                Ok(())
            }
        })
        .await?;

    supervisor
        .store()
        .record_action(
            &test_agent.agent_id,
            "create_testing_agent",
            Some(task_id),
            serde_json::json!({ "testing_task_id": test_task_id }),
        )
        .await?;

    spawn_delayed_validation(
        supervisor,
        task_id.to_string(),
        test_agent_id,
        test_task_id,
        completing_agent_id,
    );
    Ok(())
}

/// Every subtask, context entry, modified file, and action in the last
/// hour attributable to `completing_agent_id`, rendered as a prompt-ready
/// summary the testing agent's description and initial prompt both embed.
async fn gather_audit(
    supervisor: &Supervisor,
    task_id: &str,
    completing_agent_id: Option<&str>,
) -> CoreResult<String> {
    let store = supervisor.store();

    let subtasks = store.list_subtasks(task_id).await?;
    let subtask_lines: Vec<String> = subtasks
        .iter()
        .map(|t| format!("- {} ({}): {}", t.task_id, t.status.as_str(), t.title))
        .collect();

    let (context_lines, file_lines, action_lines) = match completing_agent_id {
        Some(agent_id) => {
            let context_entries: Vec<String> = store
                .list_context()
                .await?
                .into_iter()
                .filter(|c| c.updated_by == agent_id)
                .map(|c| format!("- {} (updated {})", c.context_key, c.last_updated))
                .collect();

            let files: Vec<String> = store
                .list_file_metadata()
                .await?
                .into_iter()
                .filter(|f| f.updated_by == agent_id)
                .map(|f| format!("- {} (hash {})", f.filepath, f.content_hash))
                .collect();

            let cutoff = chrono::Utc::now() - AUDIT_WINDOW;
            let actions: Vec<String> = store
                .list_actions_for_agent(agent_id)
                .await?
                .into_iter()
                .filter(|a| a.timestamp >= cutoff)
                .map(|a| format!("- {} at {}", a.action_type, a.timestamp))
                .collect();

            (context_entries, files, actions)
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let render = |label: &str, lines: &[String]| {
        if lines.is_empty() {
            format!("{label}: none")
        } else {
            format!("{label}:\n{}", lines.join("\n"))
        }
    };

    Ok(format!(
        "Audit of completing agent {}:\n{}\n{}\n{}\n{}",
        completing_agent_id.unwrap_or("none"),
        render("subtasks created", &subtask_lines),
        render("context entries touched", &context_lines),
        render("files modified", &file_lines),
        render("actions in the last hour", &action_lines),
    ))
}

/// Fires 15 seconds after launch: captures the testing agent's pane and
/// records what it found. Detached from the request that triggered it —
/// nothing awaits this handle.
fn spawn_delayed_validation(
    supervisor: &Supervisor,
    task_id: String,
    test_agent_id: String,
    test_task_id: String,
    completing_agent_id: Option<String>,
) {
    let store = supervisor.store().clone();
    let tmux = supervisor.tmux().clone();

    tokio::spawn(async move {
        sleep(VALIDATION_DELAY).await;

        let agent = match store.get_agent(&test_agent_id).await {
            Ok(Some(a)) => a,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "delayed validation: could not reload testing agent");
                return;
            }
        };
        let session = crate::tmux::session_name(&agent.agent_id, &agent.token);
        let captured = match tmux.capture_pane(&session).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "delayed validation: pane capture failed");
                return;
            }
        };

        let passed = !captured.to_lowercase().contains("fail");
        let note = if passed {
            "enhanced validation: no failure markers observed in testing pane".to_string()
        } else {
            "enhanced validation: failure markers observed; original task context archived for review".to_string()
        };
        if let Err(e) = store.append_task_note(&test_task_id, "system", &note).await {
            warn!(error = %e, "delayed validation: failed to append note");
        }

        if !passed {
            if let Ok(Some(_)) = store.get_context(&task_id).await {
                let _ = store.archive_context(&task_id).await;
            }
            if let Some(original_agent_id) = &completing_agent_id {
                if let Err(e) = store
                    .send_message(
                        &test_agent_id,
                        original_agent_id,
                        &format!("validation failed for task {task_id}; see testing task {test_task_id} for details"),
                        "validation_failure",
                        Priority::High,
                    )
                    .await
                {
                    warn!(error = %e, "delayed validation: failed to notify completing agent");
                }
            }
        }
    });
}

fn enriched_validation_prompt(
    title: &str,
    description: &str,
    task_id: &str,
    completing_agent_id: &Option<String>,
    audit: &str,
) -> String {
    format!(
        "Validate completion of task {task_id}: '{title}'. Original description: {description}. \
         Completed by: {}. Report any failing checks explicitly using the word 'fail'.\n\n{audit}",
        completing_agent_id.as_deref().unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthIndex;
    use crate::store::Store;
    use crate::tmux::MockTmuxOps;
    use crate::types::Priority;
    use std::sync::Arc;

    #[test]
    fn testing_agent_id_uses_last_six_characters() {
        assert_eq!(testing_agent_id("0123456789"), "test-456789");
        assert_eq!(testing_agent_id("abc"), "test-abc");
    }

    #[test]
    fn testing_task_id_is_prefixed() {
        assert_eq!(testing_task_id("t1"), "test-t1");
    }

    #[tokio::test]
    async fn recompletion_tears_down_and_refiles_the_testing_task() {
        let mut mock = MockTmuxOps::new();
        mock.expect_create_session().returning(|_, _, _| Ok(()));
        mock.expect_kill_session().returning(|_| Ok(()));
        mock.expect_send_keys().returning(|_, _, _| Ok(()));
        let supervisor = Supervisor::new(
            Store::open_in_memory().unwrap(),
            Arc::new(mock),
            Arc::new(AuthIndex::new()),
            "http://127.0.0.1:7878".to_string(),
        );

        supervisor
            .create_agent("agent-alpha", "/tmp", vec![], "blue".into())
            .await
            .unwrap();
        let task = supervisor
            .create_task(
                "first pass".into(),
                "do the thing".into(),
                "admin".into(),
                Priority::High,
                Some("agent-alpha".into()),
                None,
            )
            .await
            .unwrap();

        supervisor
            .update_task_status(&task.task_id, TaskStatus::Completed)
            .await
            .unwrap();
        let test_agent_id = testing_agent_id(&task.task_id);
        let test_task_id = testing_task_id(&task.task_id);
        let first_actions = supervisor
            .store()
            .list_actions_for_agent(&test_agent_id)
            .await
            .unwrap();
        assert_eq!(
            first_actions
                .iter()
                .filter(|a| a.action_type == "create_testing_agent")
                .count(),
            1
        );

        // Re-completion: same task, refreshed description, same testing
        // agent id torn down and recreated rather than left stale.
        supervisor
            .store()
            .run({
                let task_id = task.task_id.clone();
                move |conn| {
                    conn.execute(
                        "UPDATE tasks SET description = 'fixed the thing' WHERE task_id = ?1",
                        rusqlite::params![task_id],
                    )?;
                    Ok(())
                }
            })
            .await
            .unwrap();
        supervisor
            .update_task_status(&task.task_id, TaskStatus::Completed)
            .await
            .unwrap();

        let second_actions = supervisor
            .store()
            .list_actions_for_agent(&test_agent_id)
            .await
            .unwrap();
        assert_eq!(
            second_actions
                .iter()
                .filter(|a| a.action_type == "create_testing_agent")
                .count(),
            2,
            "re-completion should record exactly one new create_testing_agent action"
        );

        let test_task = supervisor.store().get_task(&test_task_id).await.unwrap().unwrap();
        assert!(test_task.description.contains("fixed the thing"));
    }
}
