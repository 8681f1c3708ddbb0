//! Resource catalog primitives: addressable, read-only views of live state.
//!
//! Each URI scheme is a variant with its own listing and content function,
//! modeled as a trait rather than an inheritance hierarchy —
//! `ResourceCatalog` implementors in the `fleetd` crate each own one
//! scheme.

use async_trait::async_trait;
use serde::Serialize;

/// Annotations surfaced alongside a resource listing, letting a client
/// render without a second round-trip.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One listed resource. `uri` is the sole addressable handle a client keeps.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub annotations: ResourceAnnotations,
}

/// Content returned by a resource fetch. JSON objects are serialized
/// pretty-printed; templates are returned as markdown.
#[derive(Debug, Clone)]
pub enum ResourceContent {
    Json(serde_json::Value),
    Markdown(String),
    PlainText(String),
}

impl ResourceContent {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResourceContent::Json(_) => "application/json",
            ResourceContent::Markdown(_) => "text/markdown",
            ResourceContent::PlainText(_) => "text/plain",
        }
    }

    pub fn into_string(self) -> String {
        match self {
            ResourceContent::Json(v) => {
                serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())
            }
            ResourceContent::Markdown(s) | ResourceContent::PlainText(s) => s,
        }
    }
}

/// Implemented once per URI scheme (`agent://`, `task://`, `tmux://`,
/// `token://`, `create://`). Listings are computed fresh on every request
/// from whatever backing store owns that entity — no caching layer here.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// The scheme this catalog owns, e.g. `"agent"`.
    fn scheme(&self) -> &'static str;

    /// List every resource currently addressable under this scheme.
    async fn list(&self) -> anyhow::Result<Vec<Resource>>;

    /// Fetch content for one URI. `uri` is guaranteed to start with
    /// `scheme() + "://"` by the caller. `is_admin` reflects whether the
    /// caller authenticated with the server's admin token, letting a
    /// catalog withhold sensitive content from non-admin callers.
    async fn fetch(&self, uri: &str, is_admin: bool) -> anyhow::Result<Option<ResourceContent>>;
}
