use serde::{Deserialize, Serialize};

/// Levels of the classification tree that are reported: root, children, grandchildren.
pub const MAX_AREA_DEPTH: usize = 3;

/// Separator between ancestor names in a materialized area path.
pub const AREA_PATH_SEPARATOR: char = '\\';

/// Node of the upstream classification tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AreaPathNode {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub children: Vec<AreaPathNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaPath {
    pub name: String,
    pub path: String,
}

impl AreaPath {
    fn new(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }
}

/// Flattens `root` depth-first into `{name, path}` pairs.
///
/// Paths are built from node names rather than the upstream `path` field.
/// Nodes below [`MAX_AREA_DEPTH`] are dropped without any marker.
pub fn flatten_area_tree(root: &AreaPathNode) -> Vec<AreaPath> {
    let mut out = Vec::new();
    push_node(root, None, 1, &mut out);
    out
}

fn push_node(node: &AreaPathNode, parent: Option<&str>, depth: usize, out: &mut Vec<AreaPath>) {
    if depth > MAX_AREA_DEPTH {
        return;
    }
    let path = match parent {
        Some(parent) => format!("{parent}{AREA_PATH_SEPARATOR}{}", node.name),
        None => node.name.clone(),
    };
    out.push(AreaPath::new(&node.name, path.clone()));
    for child in &node.children {
        push_node(child, Some(&path), depth + 1, out);
    }
}
