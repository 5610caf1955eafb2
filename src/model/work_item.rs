use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Open field bag keyed by upstream reference name (e.g. `System.Title`).
///
/// Values mirror JSON's value space. Keys iterate in lexicographic order, which
/// fixes the order of operations emitted when creating an item.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    #[serde(default)]
    pub fields: Fields,
    /// Only populated when relations were expanded in the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl Relation {
    pub fn new(rel: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            url: url.into(),
            attributes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Move => "move",
            PatchOp::Copy => "copy",
            PatchOp::Test => "test",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a JSON patch document sent to the work item endpoints.
///
/// `value` is always serialized; operations without one carry `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

impl UpdateOperation {
    pub fn add_field(name: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("/fields/{name}"),
            value,
        }
    }

    /// Appends `relation` to the end of the item's relation list.
    pub fn add_relation(relation: &Relation) -> Self {
        Self {
            op: PatchOp::Add,
            path: "/relations/-".into(),
            value: serde_json::json!({
                "rel": relation.rel,
                "url": relation.url,
            }),
        }
    }

    pub fn remove_relation(index: usize) -> Self {
        Self {
            op: PatchOp::Remove,
            path: format!("/relations/{index}"),
            value: Value::Null,
        }
    }
}

/// Profile returned alongside a login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub display_name: String,
    pub email_address: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relations_omitted_unless_present() {
        let item = WorkItem {
            id: 7,
            fields: Fields::new(),
            relations: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("relations"));

        let decoded: WorkItem = serde_json::from_str(r#"{"id":7,"fields":{}}"#).unwrap();
        assert_eq!(decoded.relations, None);
    }

    #[test]
    fn decodes_upstream_item_with_relations() {
        let raw = json!({
            "id": 12,
            "rev": 3,
            "fields": {"System.Title": "Fix login", "System.State": "Active"},
            "relations": [{
                "rel": "System.LinkTypes.Hierarchy-Reverse",
                "url": "https://dev.azure.com/acme/web/_apis/wit/workItems/4",
                "attributes": {"isLocked": false, "name": "Parent"}
            }]
        });
        let item: WorkItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.fields["System.Title"], json!("Fix login"));
        let relations = item.relations.unwrap();
        assert_eq!(relations.len(), 1);
        assert!(relations[0].url.ends_with("/workItems/4"));
        assert_eq!(relations[0].attributes.as_ref().unwrap()["name"], json!("Parent"));
    }

    #[test]
    fn remove_operation_sends_null_value() {
        let op = UpdateOperation::remove_relation(2);
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "remove", "path": "/relations/2", "value": null})
        );
    }

    #[test]
    fn explicit_null_value_is_kept() {
        let raw = r#"[{"op":"add","path":"/fields/System.Description","value":null}]"#;
        let ops: Vec<UpdateOperation> = serde_json::from_str(raw).unwrap();
        assert_eq!(ops[0].value, Value::Null);
        assert_eq!(
            serde_json::to_string(&ops).unwrap(),
            r#"[{"op":"add","path":"/fields/System.Description","value":null}]"#
        );
    }

    #[test]
    fn missing_value_decodes_as_null() {
        let raw = r#"[{"op":"remove","path":"/relations/0"}]"#;
        let ops: Vec<UpdateOperation> = serde_json::from_str(raw).unwrap();
        assert_eq!(ops[0].value, Value::Null);
    }

    #[test]
    fn caller_updates_decode_from_json() {
        let raw = r#"[{"op":"replace","path":"/fields/System.State","value":"Done"}]"#;
        let ops: Vec<UpdateOperation> = serde_json::from_str(raw).unwrap();
        assert_eq!(ops[0].op, PatchOp::Replace);
        assert_eq!(ops[0].value, json!("Done"));
    }

    #[test]
    fn unknown_patch_op_is_rejected() {
        let raw = r#"[{"op":"merge","path":"/fields/System.State"}]"#;
        assert!(serde_json::from_str::<Vec<UpdateOperation>>(raw).is_err());
    }
}
