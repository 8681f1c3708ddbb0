//! Coordination server for a fleet of AI coding agents: sessions, tasks,
//! tmux-backed subprocess supervision, and an MCP-style tool/resource
//! surface.

pub mod auth;
pub mod config;
pub mod errors;
pub mod rag;
pub mod resources;
pub mod server;
pub mod session_manager;
pub mod store;
pub mod supervisor;
pub mod tmux;
pub mod tools;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthIndex;
use crate::config::ServerConfig;
use crate::errors::CoreResult;
use crate::rag::{NullRetriever, Retriever};
use crate::resources::{AgentResources, CreateResources, ResourceHub, TaskResources, TmuxResources, TokenResources};
use crate::session_manager::SessionManager;
use crate::store::Store;
use crate::supervisor::Supervisor;
use crate::tmux::{TmuxController, TmuxOps};

/// Boots every long-lived component and returns the axum router ready to
/// be served, plus the session manager whose background tasks the caller
/// owns the shutdown of.
pub async fn build_app(config: ServerConfig) -> CoreResult<(axum::Router, Arc<SessionManager>)> {
    let store = Store::open(&config.db_path)?;
    let admin_token = store.bootstrap_admin_token().await?;
    info!(admin_token_len = admin_token.len(), "admin token ready");

    let tmux: Arc<dyn TmuxOps> = Arc::new(TmuxController::new());
    if !tmux.available().await {
        tracing::warn!("tmux binary not found on PATH; agent sessions will fail to launch");
    }

    let auth = Arc::new(AuthIndex::new());
    let agents = store.list_agents().await?;
    for agent in &agents {
        if agent.status != types::AgentStatus::Active {
            continue;
        }
        auth.insert(&agent.agent_id, &agent.token);
    }
    reconcile_agents_at_boot(&store, &tmux, &agents).await?;

    let server_url = std::env::var("FLEETD_SERVER_URL").unwrap_or_else(|_| format!("http://{}", config.bind_addr));
    let supervisor = Supervisor::new(store.clone(), tmux.clone(), auth.clone(), server_url);
    let sessions = SessionManager::new(store.clone());
    sessions.spawn_background_tasks();

    let retriever: Arc<dyn Retriever> = Arc::new(NullRetriever);

    let deps = tools::ToolDeps {
        store: store.clone(),
        supervisor: supervisor.clone(),
        retriever: retriever.clone(),
    };
    let mut registry = tools::build_registry(&deps);
    let update = registry.update_configuration(&config.enabled_categories);
    for err in &update.errors {
        tracing::warn!(%err, "tool category configuration rejected at boot");
    }

    let resources = ResourceHub::new(vec![
        Arc::new(AgentResources::new(store.clone())),
        Arc::new(TaskResources::new(store.clone())),
        Arc::new(TmuxResources::new(tmux.clone())),
        Arc::new(TokenResources::new(store.clone())),
        Arc::new(CreateResources),
    ]);

    let state = Arc::new(server::AppState {
        store,
        tmux,
        auth,
        supervisor,
        sessions: sessions.clone(),
        registry: RwLock::new(registry),
        resources,
        retriever,
        config,
        started_at: Instant::now(),
        admin_token,
    });

    Ok((server::build_router(state), sessions))
}

/// Marks agents terminated if their tmux session vanished while the
/// server was down. Shares the boot-time `list_agents` fetch with
/// `AuthIndex` hydration rather than querying the store twice.
async fn reconcile_agents_at_boot(
    store: &Store,
    tmux: &Arc<dyn TmuxOps>,
    agents: &[types::Agent],
) -> CoreResult<()> {
    let expected: Vec<String> = agents
        .iter()
        .filter(|a| a.status == types::AgentStatus::Active)
        .map(|a| crate::tmux::session_name(&a.agent_id, &a.token))
        .collect();
    let vanished = tmux.discover_vanished(&expected).await.unwrap_or_default();
    if !vanished.is_empty() {
        info!(count = vanished.len(), "reconciling agents with vanished tmux sessions");
    }
    for agent in agents {
        if agent.status != types::AgentStatus::Active {
            continue;
        }
        let session = crate::tmux::session_name(&agent.agent_id, &agent.token);
        if vanished.contains(&session) {
            store
                .set_agent_status(&agent.agent_id, types::AgentStatus::Terminated)
                .await?;
        }
    }
    Ok(())
}
