//! tmux subprocess controller.
//!
//! Same subprocess-per-call shape and validate-before-shell-out discipline
//! as a typical `TmuxClient`: every command runs through
//! `tokio::process::Command` so a hung tmux server doesn't block the
//! executor, wrapped in a timeout so a wedged tmux server surfaces as
//! an `ErrSubprocessTimeout` rather than hanging forever.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::CoreError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux binary not found on PATH")]
    NotFound,
    #[error("session '{0}' does not exist")]
    SessionNotFound(String),
    #[error("invalid session name '{0}'")]
    InvalidSessionName(String),
    #[error("tmux command failed: {0}")]
    CommandFailed(String),
    #[error("tmux command timed out after {0:?}")]
    TimedOut(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TmuxError> for CoreError {
    fn from(e: TmuxError) -> Self {
        match e {
            TmuxError::TimedOut(d) => CoreError::SubprocessTimeout(format!("{d:?}")),
            other => CoreError::Subprocess(other.to_string()),
        }
    }
}

/// Sanitizes an arbitrary agent id into a tmux-safe session-name fragment:
/// tmux session names reject `.`, `:`, and bracket/quote characters, so
/// those plus whitespace fold to `_`, runs of `_` collapse to one, and the
/// result is forced to start alphanumeric. A name that sanitizes away to
/// nothing falls back to `agent_session` rather than producing an empty
/// tmux `-s` argument.
pub fn sanitize(agent_id: &str) -> String {
    let re = Regex::new(r#"[.:\[\]"'\\\s]+"#).expect("static pattern");
    let folded = re.replace_all(agent_id, "_").to_string();
    let collapsed = Regex::new(r"_+")
        .expect("static pattern")
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_lowercase();
    match collapsed.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() => collapsed,
        _ => "agent_session".to_string(),
    }
}

/// Deterministic session name: `sanitize(agent_id) + "-" + last4(token)`,
/// so recreating a session for the same agent+token is idempotent rather
/// than accumulating duplicates.
pub fn session_name(agent_id: &str, token: &str) -> String {
    format!("{}-{}", sanitize(agent_id), crate::auth::last4(token))
}

/// The tmux operations the rest of the crate needs, as a trait so unit
/// tests can swap in a `MockTmuxOps` instead of shelling out to a real
/// `tmux` binary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TmuxOps: Send + Sync {
    async fn available(&self) -> bool;
    async fn session_exists(&self, name: &str) -> Result<bool, TmuxError>;
    async fn create_session(
        &self,
        name: &str,
        working_dir: &str,
        env: &[(String, String)],
    ) -> Result<(), TmuxError>;
    async fn kill_session(&self, name: &str) -> Result<(), TmuxError>;
    async fn send_keys(&self, name: &str, keys: &str, submit: bool) -> Result<(), TmuxError>;
    async fn capture_pane(&self, name: &str) -> Result<String, TmuxError>;
    async fn list_sessions(&self) -> Result<Vec<String>, TmuxError>;
    async fn list_panes(&self, name: &str) -> Result<Vec<String>, TmuxError>;
    async fn discover_vanished(&self, expected_names: &[String]) -> Result<Vec<String>, TmuxError>;
}

pub struct TmuxController {
    timeout: Duration,
}

impl Default for TmuxController {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TmuxController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let fut = Command::new("tmux").args(args).output();
        let output = timeout(self.timeout, fut)
            .await
            .map_err(|_| TmuxError::TimedOut(self.timeout))??;
        if !output.status.success() {
            return Err(TmuxError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Whether the `tmux` binary is reachable at all (the
    /// tmux-unavailable case).
    pub async fn available(&self) -> bool {
        matches!(Command::new("tmux").arg("-V").output().await, Ok(o) if o.status.success())
    }

    pub async fn session_exists(&self, name: &str) -> Result<bool, TmuxError> {
        match self.run(&["has-session", "-t", name]).await {
            Ok(_) => Ok(true),
            Err(TmuxError::CommandFailed(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Creates a detached session, or is a no-op if one by that name
    /// already exists, so a completion retry is safe. `env` entries are
    /// injected as `-e KEY=VALUE` so the agent runtime boots with its id,
    /// token, and server URL already in its environment.
    pub async fn create_session(
        &self,
        name: &str,
        working_dir: &str,
        env: &[(String, String)],
    ) -> Result<(), TmuxError> {
        if name.is_empty() || name.contains(':') || name.contains('.') {
            return Err(TmuxError::InvalidSessionName(name.to_string()));
        }
        if self.session_exists(name).await? {
            return Ok(());
        }
        let mut args: Vec<String> = vec![
            "new-session".to_string(),
            "-d".to_string(),
            "-s".to_string(),
            name.to_string(),
            "-c".to_string(),
            working_dir.to_string(),
        ];
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&refs).await?;
        Ok(())
    }

    pub async fn kill_session(&self, name: &str) -> Result<(), TmuxError> {
        match self.run(&["kill-session", "-t", name]).await {
            Ok(_) => Ok(()),
            Err(TmuxError::CommandFailed(_)) => Err(TmuxError::SessionNotFound(name.to_string())),
            Err(other) => Err(other),
        }
    }

    /// Sends literal keystrokes, optionally followed by Enter (used both for
    /// pause-via-keystrokes and general keyboard submission).
    pub async fn send_keys(&self, name: &str, keys: &str, submit: bool) -> Result<(), TmuxError> {
        self.run(&["send-keys", "-t", name, keys]).await?;
        if submit {
            self.run(&["send-keys", "-t", name, "Enter"]).await?;
        }
        Ok(())
    }

    pub async fn capture_pane(&self, name: &str) -> Result<String, TmuxError> {
        self.run(&["capture-pane", "-t", name, "-p"]).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        match self.run(&["list-sessions", "-F", "#{session_name}"]).await {
            Ok(out) => Ok(out.lines().map(str::to_string).collect()),
            Err(TmuxError::CommandFailed(_)) => Ok(Vec::new()),
            Err(other) => Err(other),
        }
    }

    pub async fn list_panes(&self, name: &str) -> Result<Vec<String>, TmuxError> {
        let out = self
            .run(&["list-panes", "-t", name, "-F", "#{pane_id}"])
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Reconciles live tmux sessions against known agent session names at
    /// boot. Returns the subset of
    /// `expected_names` that are NOT currently running.
    pub async fn discover_vanished(&self, expected_names: &[String]) -> Result<Vec<String>, TmuxError> {
        let live = self.list_sessions().await?;
        Ok(expected_names
            .iter()
            .filter(|n| !live.contains(n))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TmuxOps for TmuxController {
    async fn available(&self) -> bool {
        TmuxController::available(self).await
    }

    async fn session_exists(&self, name: &str) -> Result<bool, TmuxError> {
        TmuxController::session_exists(self, name).await
    }

    async fn create_session(
        &self,
        name: &str,
        working_dir: &str,
        env: &[(String, String)],
    ) -> Result<(), TmuxError> {
        TmuxController::create_session(self, name, working_dir, env).await
    }

    async fn kill_session(&self, name: &str) -> Result<(), TmuxError> {
        TmuxController::kill_session(self, name).await
    }

    async fn send_keys(&self, name: &str, keys: &str, submit: bool) -> Result<(), TmuxError> {
        TmuxController::send_keys(self, name, keys, submit).await
    }

    async fn capture_pane(&self, name: &str) -> Result<String, TmuxError> {
        TmuxController::capture_pane(self, name).await
    }

    async fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        TmuxController::list_sessions(self).await
    }

    async fn list_panes(&self, name: &str) -> Result<Vec<String>, TmuxError> {
        TmuxController::list_panes(self, name).await
    }

    async fn discover_vanished(&self, expected_names: &[String]) -> Result<Vec<String>, TmuxError> {
        TmuxController::discover_vanished(self, expected_names).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_folds_unsafe_characters() {
        assert_eq!(sanitize("agent one:two"), "agent_one_two");
        assert_eq!(sanitize("Agent_42"), "agent_42");
    }

    #[test]
    fn sanitize_collapses_runs_and_trims() {
        assert_eq!(sanitize("agent..  ..one"), "agent_one");
        assert_eq!(sanitize("___agent___"), "agent");
    }

    #[test]
    fn sanitize_falls_back_when_result_is_empty_or_non_alphanumeric_start() {
        assert_eq!(sanitize("..."), "agent_session");
        assert_eq!(sanitize("_42agent"), "42agent");
    }

    #[test]
    fn session_name_is_deterministic() {
        let name = session_name("agent one", "abcdef123456");
        assert_eq!(name, "agent_one-3456");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn invalid_session_name_rejected_before_shelling_out() {
        let controller = TmuxController::new();
        let err = controller
            .create_session("bad:name", "/tmp", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TmuxError::InvalidSessionName(_)));
    }
}
