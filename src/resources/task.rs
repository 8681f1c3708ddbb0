use async_trait::async_trait;
use mcp_kernel::resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};

use crate::store::Store;

pub struct TaskResources {
    store: Store,
}

impl TaskResources {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceCatalog for TaskResources {
    fn scheme(&self) -> &'static str {
        "task"
    }

    async fn list(&self) -> anyhow::Result<Vec<Resource>> {
        let tasks = self.store.list_all_tasks().await?;
        Ok(tasks
            .into_iter()
            .map(|t| Resource {
                uri: format!("task://{}", t.task_id),
                name: t.title.clone(),
                description: t.description.clone(),
                mime_type: "application/json".to_string(),
                annotations: ResourceAnnotations {
                    status: Some(t.status.as_str().to_string()),
                    priority: Some(t.priority.as_str().to_string()),
                    ..Default::default()
                },
            })
            .collect())
    }

    async fn fetch(&self, uri: &str, _is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        let task_id = uri.trim_start_matches("task://");
        let task = self.store.get_task(task_id).await?;
        Ok(task.map(|t| ResourceContent::Json(serde_json::to_value(t).unwrap_or_default())))
    }
}
