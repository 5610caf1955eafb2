use serde::Deserialize;
use tracing::debug;

use super::transport::{Method, RequestBody};
use super::{ClientHandle, API_VERSION};
use crate::error::Result;
use crate::model::work_item::{Fields, UpdateOperation, UserInfo, WorkItem};

/// Work item types returned by [`ClientHandle::list_work_items`].
pub const WORK_ITEM_TYPES: &[&str] = &[
    "Product Backlog Item",
    "User Story",
    "Bug",
    "Epic",
    "Feature",
];

#[derive(Deserialize)]
struct WiqlResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Deserialize)]
struct WorkItemRef {
    id: i64,
}

#[derive(Deserialize)]
struct WorkItemBatch {
    #[serde(default)]
    value: Vec<WorkItem>,
}

/// Query selecting the ids of every allow-listed item in `project`, oldest first.
pub fn work_item_query(project: &str) -> String {
    let types = WORK_ITEM_TYPES
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = '{}' AND [System.WorkItemType] IN ({types}) ORDER BY [System.Id]",
        project.replace('\'', "''")
    )
}

/// One `add` operation per field, in field-name order.
pub fn create_operations(fields: &Fields) -> Vec<UpdateOperation> {
    fields
        .iter()
        .map(|(name, value)| UpdateOperation::add_field(name, value.clone()))
        .collect()
}

impl ClientHandle {
    /// Lists work items in two phases: resolve matching ids, then fetch them in one batch.
    ///
    /// An empty id set short-circuits without the batch call.
    pub async fn list_work_items(&self) -> Result<Vec<WorkItem>> {
        let phase = "get work items";
        let wiql_url = format!("{}/wit/wiql?api-version={API_VERSION}", self.base_url);
        let query = serde_json::json!({ "query": work_item_query(self.project()) });
        let ids: WiqlResult = self
            .send(Method::Post, wiql_url, Some(RequestBody::Query(query)), phase)
            .await?
            .json(phase)?;

        if ids.work_items.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = ids.work_items.len(), "hydrating work items");

        let phase = "get work item details";
        let id_list = ids
            .work_items
            .iter()
            .map(|r| r.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let batch_url = format!(
            "{}/wit/workitems?ids={id_list}&$expand=all&api-version={API_VERSION}",
            self.base_url
        );
        let batch: WorkItemBatch = self
            .send(Method::Get, batch_url, None, phase)
            .await?
            .json(phase)?;

        Ok(batch.value)
    }

    /// Applies `updates` to item `id` in a single PATCH.
    pub async fn update_work_item(&self, id: i64, updates: &[UpdateOperation]) -> Result<()> {
        self.patch(Method::Patch, self.work_item_url(id), updates, "update work item")
            .await?;
        Ok(())
    }

    pub async fn create_work_item(&self, work_item_type: &str, fields: &Fields) -> Result<WorkItem> {
        let phase = "create work item";
        let url = format!(
            "{}/wit/workitems/${}?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(work_item_type)
        );
        self.patch(Method::Post, url, &create_operations(fields), phase)
            .await?
            .json(phase)
    }

    pub async fn get_work_item_with_relations(&self, id: i64) -> Result<WorkItem> {
        let phase = "get work item";
        let url = format!(
            "{}/wit/workitems/{id}?$expand=relations&api-version={API_VERSION}",
            self.base_url
        );
        self.send(Method::Get, url, None, phase).await?.json(phase)
    }

    /// Profile reported after login. The upstream profile API is not queried.
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            display_name: "Azure DevOps User".into(),
            email_address: String::new(),
            id: self.organization().to_string(),
        }
    }

    pub(super) fn work_item_url(&self, id: i64) -> String {
        format!("{}/wit/workitems/{id}?api-version={API_VERSION}", self.base_url)
    }
}
