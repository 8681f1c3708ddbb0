use async_trait::async_trait;
use mcp_kernel::resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};

const AGENT_TEMPLATE: &str = "# create://agent\n\n\
Required fields for `agent_management.create_agent`:\n\n\
- `agent_id` (string, unique)\n\
- `capabilities` (array of strings)\n\
- `working_directory` (string, absolute path)\n";

const TASK_TEMPLATE: &str = "# create://task\n\n\
Required fields for `task_management.create_task`:\n\n\
- `title` (string)\n\
- `description` (string)\n\
- `priority` (`low` | `medium` | `high`)\n\
- `assigned_to` (optional agent id)\n\
- `parent_task` (optional task id; must not introduce a cycle)\n";

/// Static, always-available creation-form templates. Not backed by a
/// store: the content is fixed documentation, not live state.
pub struct CreateResources;

#[async_trait]
impl ResourceCatalog for CreateResources {
    fn scheme(&self) -> &'static str {
        "create"
    }

    async fn list(&self) -> anyhow::Result<Vec<Resource>> {
        Ok(vec![
            Resource {
                uri: "create://agent".to_string(),
                name: "create agent".to_string(),
                description: "required fields to create an agent".to_string(),
                mime_type: "text/markdown".to_string(),
                annotations: ResourceAnnotations {
                    r#type: Some("template".to_string()),
                    ..Default::default()
                },
            },
            Resource {
                uri: "create://task".to_string(),
                name: "create task".to_string(),
                description: "required fields to create a task".to_string(),
                mime_type: "text/markdown".to_string(),
                annotations: ResourceAnnotations {
                    r#type: Some("template".to_string()),
                    ..Default::default()
                },
            },
        ])
    }

    async fn fetch(&self, uri: &str, _is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        match uri {
            "create://agent" => Ok(Some(ResourceContent::Markdown(AGENT_TEMPLATE.to_string()))),
            "create://task" => Ok(Some(ResourceContent::Markdown(TASK_TEMPLATE.to_string()))),
            _ => Ok(None),
        }
    }
}
