//! Protocol primitives for an MCP-style coordination server.
//!
//! This crate owns the wire format (JSON-RPC 2.0 requests/responses/
//! notifications), the streaming HTTP transport envelope, and the generic
//! tool/resource registry abstractions. It has no notion of agents, tasks,
//! or tmux — those live in the crate that depends on this one. Keeping the
//! split mirrors the distinction between "how a client and server talk" and
//! "what they talk about".

pub mod jsonrpc;
pub mod registry;
pub mod resource;
pub mod tool;
pub mod transport;

pub use jsonrpc::{
    ErrorCode, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, JSONRPC_VERSION,
};
pub use registry::{RegistryError, RegistryUpdate, ToolRegistry};
pub use resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};
pub use tool::{ContentItem, Tool, ToolContext, ToolDef, ToolResult};
pub use transport::{SseTransport, Transport, TransportError};

/// Crate version, surfaced in `/health` responses.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
