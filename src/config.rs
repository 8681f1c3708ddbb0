//! Server configuration.
//!
//! Layering: compiled-in defaults, then an optional `config.toml`, then
//! `FLEETD_`-prefixed environment variables, each layer overriding the
//! last. A handful of boolean switches (`ENABLE_AGENTS`, `ENABLE_RAG`,
//! `CI`) are read directly from bare env vars rather than through the
//! `config` crate, the usual way ambient CI-style flags are read outside
//! a layered config.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Tool categories gate which tools `ToolRegistry::list`/`execute` expose.
/// `Basic` can never be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Basic,
    AgentManagement,
    TaskManagement,
    FileManagement,
    Memory,
    AgentCommunication,
    SessionState,
    AssistanceRequest,
    BackgroundAgents,
    Rag,
}

impl ToolCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::Basic => "basic",
            ToolCategory::AgentManagement => "agent_management",
            ToolCategory::TaskManagement => "task_management",
            ToolCategory::FileManagement => "file_management",
            ToolCategory::Memory => "memory",
            ToolCategory::AgentCommunication => "agent_communication",
            ToolCategory::SessionState => "session_state",
            ToolCategory::AssistanceRequest => "assistance_request",
            ToolCategory::BackgroundAgents => "background_agents",
            ToolCategory::Rag => "rag",
        }
    }

    pub const ALL: [ToolCategory; 10] = [
        ToolCategory::Basic,
        ToolCategory::AgentManagement,
        ToolCategory::TaskManagement,
        ToolCategory::FileManagement,
        ToolCategory::Memory,
        ToolCategory::AgentCommunication,
        ToolCategory::SessionState,
        ToolCategory::AssistanceRequest,
        ToolCategory::BackgroundAgents,
        ToolCategory::Rag,
    ];

    /// The set enabled out of the box: everything except the opt-in
    /// background-agent and RAG surfaces.
    pub fn default_enabled() -> HashSet<&'static str> {
        ToolCategory::ALL
            .iter()
            .filter(|c| !matches!(c, ToolCategory::BackgroundAgents | ToolCategory::Rag))
            .map(|c| c.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub heartbeat_interval_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub grace_period_minutes: i64,
    pub max_recovery_attempts: u32,
    pub enabled_categories: Vec<String>,
    pub enable_agents: bool,
    pub enable_rag: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7878".to_string(),
            db_path: PathBuf::from("fleetd.db"),
            log_dir: None,
            heartbeat_interval_secs: 30,
            session_sweep_interval_secs: 300,
            grace_period_minutes: 10,
            max_recovery_attempts: 3,
            enabled_categories: ToolCategory::default_enabled()
                .into_iter()
                .map(str::to_string)
                .collect(),
            enable_agents: true,
            enable_rag: false,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then `config.toml` in `config_dir` if present, then
    /// `FLEETD_*` environment overrides, then folds in the handful of bare
    /// bare env switches read outside the layered config.
    pub fn load(config_dir: Option<&std::path::Path>) -> CoreResult<Self> {
        let defaults = ServerConfig::default();
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults).map_err(|e| CoreError::Internal(e.to_string()))?,
        );

        if let Some(dir) = config_dir {
            let candidate = dir.join("config.toml");
            if candidate.exists() {
                builder = builder.add_source(config::File::from(candidate));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLEETD")
                .separator("__")
                .try_parsing(true),
        );

        let mut cfg: ServerConfig = builder
            .build()
            .map_err(|e| CoreError::Validation(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        if let Ok(v) = std::env::var("ENABLE_AGENTS") {
            cfg.enable_agents = parse_bool_env(&v, cfg.enable_agents);
        }
        if let Ok(v) = std::env::var("ENABLE_RAG") {
            cfg.enable_rag = parse_bool_env(&v, cfg.enable_rag);
        }
        if !cfg.enable_rag {
            cfg.enabled_categories.retain(|c| c != ToolCategory::Rag.as_str());
        }
        if !cfg.enable_agents {
            cfg.enabled_categories
                .retain(|c| c != ToolCategory::BackgroundAgents.as_str());
        }

        Ok(cfg)
    }
}

fn parse_bool_env(value: &str, fallback: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

/// Whether the process is running under CI, read directly from the bare
/// `CI` variable most CI runners set (not layered through `config`).
pub fn running_in_ci() -> bool {
    std::env::var("CI").map(|v| !v.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_excludes_opt_in_categories() {
        let cfg = ServerConfig::default();
        assert!(!cfg
            .enabled_categories
            .contains(&ToolCategory::Rag.as_str().to_string()));
        assert!(cfg
            .enabled_categories
            .contains(&ToolCategory::Basic.as_str().to_string()));
    }

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        assert!(parse_bool_env("true", false));
        assert!(parse_bool_env("1", false));
        assert!(!parse_bool_env("0", true));
        assert!(parse_bool_env("garbage", true));
    }
}
