use super::transport::Method;
use super::ClientHandle;
use crate::error::Result;
use crate::model::work_item::{Relation, UpdateOperation};

impl ClientHandle {
    /// Resource URL the upstream uses to identify work item `id` in relations.
    pub fn relation_target_url(&self, id: i64) -> String {
        format!("{}/wit/workitems/{id}", self.base_url)
    }

    /// Patch document appending a `rel_type` link from an item to `parent_id`.
    pub fn add_relation_operations(&self, parent_id: i64, rel_type: &str) -> Vec<UpdateOperation> {
        let relation = Relation::new(rel_type, self.relation_target_url(parent_id));
        vec![UpdateOperation::add_relation(&relation)]
    }

    pub async fn add_relation(&self, child_id: i64, parent_id: i64, rel_type: &str) -> Result<()> {
        let ops = self.add_relation_operations(parent_id, rel_type);
        self.patch(
            Method::Patch,
            self.work_item_url(child_id),
            &ops,
            "add work item relation",
        )
        .await?;
        Ok(())
    }

    /// Removes the relation at `index` of item `work_item_id`.
    ///
    /// Relations are addressed by position, so `index` must come from a fresh
    /// read of the item. It is not re-checked here; an out-of-range index is
    /// reported by the upstream.
    pub async fn remove_relation(&self, work_item_id: i64, index: usize) -> Result<()> {
        let ops = [UpdateOperation::remove_relation(index)];
        self.patch(
            Method::Patch,
            self.work_item_url(work_item_id),
            &ops,
            "remove work item relation",
        )
        .await?;
        Ok(())
    }
}
