use super::transport::Method;
use super::{ClientHandle, API_VERSION};
use crate::error::Result;
use crate::model::area_path::{flatten_area_tree, AreaPath, AreaPathNode};

impl ClientHandle {
    pub async fn list_area_paths(&self) -> Result<Vec<AreaPath>> {
        let phase = "get area paths";
        let url = format!(
            "{}/wit/classificationnodes/Areas?api-version={API_VERSION}&$depth=10",
            self.base_url
        );
        let root: AreaPathNode = self.send(Method::Get, url, None, phase).await?.json(phase)?;
        Ok(flatten_area_tree(&root))
    }
}
