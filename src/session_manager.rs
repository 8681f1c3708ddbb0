//! MCP session lifecycle: heartbeats, disconnect/recover/expire, and the
//! background sweeper.
//!
//! Follows the usual `Arc<RwLock<HashMap<...>>>` active-task tracking
//! idiom for a session coordinator; here the map tracks live transports
//! instead of tasks, and a `dashmap` replaces the `Mutex`/`RwLock` pairing
//! since sessions are independent of each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::CoreResult;
use crate::store::{Store, GRACE_PERIOD_MINUTES};
use crate::types::McpSessionRow;
use mcp_kernel::transport::Transport;

pub struct ActiveSession {
    pub transport: Arc<dyn Transport>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_recovered: bool,
}

/// Process-wide table of live sessions plus the background tasks that
/// keep it honest. Dropping this value cancels the heartbeat and sweeper
/// loops.
pub struct SessionManager {
    store: Store,
    active_sessions: DashMap<String, ActiveSession>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            store,
            active_sessions: DashMap::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn open_session(
        &self,
        mcp_session_id: &str,
        working_directory: &str,
        transport: Arc<dyn Transport>,
    ) -> CoreResult<()> {
        self.store
            .init_session(mcp_session_id, working_directory, serde_json::json!({}))
            .await?;
        let now = Utc::now();
        self.active_sessions.insert(
            mcp_session_id.to_string(),
            ActiveSession {
                transport,
                created_at: now,
                last_activity: now,
                is_recovered: false,
            },
        );
        Ok(())
    }

    pub fn touch(&self, mcp_session_id: &str) {
        if let Some(mut entry) = self.active_sessions.get_mut(mcp_session_id) {
            entry.last_activity = Utc::now();
        }
    }

    pub async fn heartbeat(&self, mcp_session_id: &str) -> CoreResult<()> {
        self.touch(mcp_session_id);
        self.store.update_heartbeat(mcp_session_id).await
    }

    /// Called when a transport observes its connection drop. Leaves the
    /// session in the durable store so `recover` can find it within the
    /// grace window, but removes it from the in-memory active table.
    pub async fn disconnect(&self, mcp_session_id: &str) -> CoreResult<DateTime<Utc>> {
        self.active_sessions.remove(mcp_session_id);
        let expires = self.store.mark_disconnected(mcp_session_id).await?;
        info!(mcp_session_id, %expires, "session disconnected, grace period started");
        Ok(expires)
    }

    pub async fn recover(
        &self,
        mcp_session_id: &str,
        transport: Arc<dyn Transport>,
        working_directory: &str,
    ) -> CoreResult<McpSessionRow> {
        let _ = working_directory;
        let row = self.store.try_recover(mcp_session_id).await?;
        let now = Utc::now();
        self.active_sessions.insert(
            mcp_session_id.to_string(),
            ActiveSession {
                transport,
                created_at: now,
                last_activity: now,
                is_recovered: true,
            },
        );
        Ok(row)
    }

    pub fn is_active(&self, mcp_session_id: &str) -> bool {
        self.active_sessions.contains_key(mcp_session_id)
    }

    pub async fn list_sessions(&self) -> CoreResult<Vec<McpSessionRow>> {
        self.store.list_sessions().await
    }

    /// Background heartbeat-timeout scan plus the 5-minute expired-session
    /// sweep, both cancellable via `shutdown_handle`.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        let heartbeat_timeout = Duration::from_secs(90);
        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = interval.tick() => manager.scan_stale_heartbeats(heartbeat_timeout).await,
                }
            }
        });

        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match manager.store.expire_past_grace().await {
                            Ok(expired) if !expired.is_empty() => {
                                info!(count = expired.len(), "swept expired sessions");
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "session sweep failed"),
                        }
                    }
                }
            }
        });
    }

    async fn scan_stale_heartbeats(&self, timeout: Duration) {
        let now = Utc::now();
        let stale: Vec<String> = self
            .active_sessions
            .iter()
            .filter(|e| {
                now.signed_duration_since(e.value().last_activity)
                    .to_std()
                    .map(|d| d > timeout)
                    .unwrap_or(false)
            })
            .map(|e| e.key().clone())
            .collect();
        for session_id in stale {
            debug!(session_id, "heartbeat stale, marking disconnected");
            if let Err(e) = self.disconnect(&session_id).await {
                warn!(session_id, error = %e, "failed to mark stale session disconnected");
            }
        }
    }

    pub fn grace_period_minutes(&self) -> i64 {
        GRACE_PERIOD_MINUTES
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
