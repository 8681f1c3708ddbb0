//! Tool registration. One module per category; `build_registry`
//! wires every tool into an `mcp_kernel::ToolRegistry` with the category
//! set a freshly booted server starts with.

mod agent_communication;
mod agent_management;
mod assistance_request;
mod background_agents;
mod basic;
mod file_management;
mod memory;
mod rag;
mod session_state;
mod task_management;

use std::sync::Arc;

use mcp_kernel::registry::ToolRegistry;

use crate::config::ToolCategory;
use crate::rag::Retriever;
use crate::store::Store;
use crate::supervisor::Supervisor;

pub struct ToolDeps {
    pub store: Store,
    pub supervisor: Arc<Supervisor>,
    pub retriever: Arc<dyn Retriever>,
}

pub fn build_registry(deps: &ToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    basic::register(&mut registry, deps);
    agent_management::register(&mut registry, deps);
    task_management::register(&mut registry, deps);
    file_management::register(&mut registry, deps);
    memory::register(&mut registry, deps);
    agent_communication::register(&mut registry, deps);
    session_state::register(&mut registry, deps);
    assistance_request::register(&mut registry, deps);
    background_agents::register(&mut registry, deps);
    rag::register(&mut registry, deps);

    let _ = registry.update_configuration(
        &ToolCategory::default_enabled()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>(),
    );
    registry
}
