//! Plain-value form of a composition for persistence, clipboard and files.
//!
//! [`to_object`] mirrors the tree one to one. [`from_value`] is lenient: it accepts
//! older container shapes and skips what it cannot read, so partially corrupt
//! persisted state still loads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::domain::arena::{Composition, NodeData, NodeId, Parent};
use crate::domain::entities::{split_sign, Factor, Fragment, Group, DEFAULT_GROUP_NAME};
use crate::domain::error::SnapshotError;

/// Current wire format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeObject {
    pub version: u32,
    pub children: Vec<NodeObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type")]
pub enum NodeObject {
    #[serde(rename = "text")]
    Text(TextObject),
    #[serde(rename = "group")]
    Group(GroupObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObject {
    pub id: String,
    pub enabled: bool,
    pub text: String,
    pub factor: Option<Factor>,
    pub is_negative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupObject {
    pub id: String,
    pub enabled: bool,
    pub name: String,
    pub factor: Option<Factor>,
    pub is_negative: bool,
    pub children: Vec<NodeObject>,
}

impl TreeObject {
    /// Copy with every id blanked, for structural comparison.
    pub fn without_ids(&self) -> TreeObject {
        TreeObject {
            version: self.version,
            children: self.children.iter().map(NodeObject::without_ids).collect(),
        }
    }
}

impl NodeObject {
    fn without_ids(&self) -> NodeObject {
        match self {
            NodeObject::Text(text) => NodeObject::Text(TextObject {
                id: String::new(),
                ..text.clone()
            }),
            NodeObject::Group(group) => NodeObject::Group(GroupObject {
                id: String::new(),
                children: group.children.iter().map(NodeObject::without_ids).collect(),
                ..group.clone()
            }),
        }
    }
}

/// Mirror the tree as plain data.
pub fn to_object(tree: &Composition) -> TreeObject {
    TreeObject {
        version: SNAPSHOT_VERSION,
        children: objects_for(tree, tree.roots()),
    }
}

fn objects_for(tree: &Composition, ids: &[NodeId]) -> Vec<NodeObject> {
    ids.iter()
        .filter_map(|&id| tree.get_node(id).map(|node| (id, node)))
        .map(|(id, node)| match &node.data {
            NodeData::Fragment(f) => NodeObject::Text(TextObject {
                id: id.to_string(),
                enabled: f.enabled,
                text: f.text.clone(),
                factor: f.factor,
                is_negative: f.negative,
            }),
            NodeData::Group(g) => NodeObject::Group(GroupObject {
                id: id.to_string(),
                enabled: g.enabled,
                name: g.name.clone(),
                factor: g.factor,
                is_negative: g.negative,
                children: objects_for(tree, &node.children),
            }),
        })
        .collect()
}

/// Rebuild a tree from its typed object form. Ids are regenerated.
pub fn from_object(object: &TreeObject) -> Composition {
    let mut tree = Composition::new();
    for node in &object.children {
        insert_object(&mut tree, Parent::Root, node);
    }
    tree
}

fn insert_object(tree: &mut Composition, parent: Parent, object: &NodeObject) {
    let no_children: &[NodeObject] = &[];
    // typed objects carry the sign explicitly, so content is taken verbatim
    let (data, children) = match object {
        NodeObject::Text(t) => (
            NodeData::Fragment(Fragment {
                enabled: t.enabled,
                text: t.text.clone(),
                factor: t.factor,
                negative: t.is_negative,
            }),
            no_children,
        ),
        NodeObject::Group(g) => (
            NodeData::Group(Group {
                enabled: g.enabled,
                name: non_blank_name(&g.name),
                factor: g.factor,
                negative: g.is_negative,
            }),
            g.children.as_slice(),
        ),
    };
    if let Ok(id) = tree.insert_node(data, parent, usize::MAX) {
        for child in children {
            insert_object(tree, Parent::Group(id), child);
        }
    }
}

fn non_blank_name(name: &str) -> String {
    if name.trim().is_empty() {
        DEFAULT_GROUP_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Plain JSON value of the tree.
pub fn to_value(tree: &Composition) -> Value {
    // TreeObject holds only strings, bools, numbers and arrays
    serde_json::to_value(to_object(tree)).unwrap_or(Value::Null)
}

/// Rebuild a tree from any JSON value, tolerating partial corruption.
///
/// Accepted root shapes: `{"children": [...]}`, the groups-only `{"groups": [...]}`,
/// `{"childs": [...]}`, or a bare array. Anything else yields an empty tree.
#[instrument(level = "debug", skip(value))]
pub fn from_value(value: &Value) -> Composition {
    let mut tree = Composition::new();
    let legacy = value.get("version").is_none();
    let entries: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => first_array(map, &["children", "childs", "groups"]),
        _ => &[],
    };
    for entry in entries {
        read_node(&mut tree, Parent::Root, entry, legacy);
    }
    debug!("from_value: loaded {} nodes", tree.len());
    tree
}

fn first_array<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| map.get(*key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn array_at<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Group,
}

fn kind_of(map: &Map<String, Value>) -> Option<Kind> {
    match map.get("__type") {
        Some(Value::String(tag)) if tag == "text" => Some(Kind::Text),
        Some(Value::String(tag)) if tag == "group" => Some(Kind::Group),
        Some(_) => None,
        // untagged entries from the groups-only era are recognised by shape
        None if ["name", "children", "childs", "texts", "groups"]
            .iter()
            .any(|k| map.contains_key(*k)) =>
        {
            Some(Kind::Group)
        }
        None if map.contains_key("text") => Some(Kind::Text),
        None => None,
    }
}

fn read_factor(map: &Map<String, Value>) -> Option<Factor> {
    match map.get("factor") {
        Some(Value::Number(n)) => n.as_f64().and_then(Factor::from_f64),
        Some(Value::String(s)) => Factor::parse(s),
        _ => None,
    }
}

fn read_bool(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn read_str<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Sign and content of a text or name.
///
/// Versioned snapshots keep content verbatim. Unversioned ones come from editors that
/// encoded the sign as an `n!` prefix, which is folded into the flag.
fn read_signed(map: &Map<String, Value>, raw: &str, legacy: bool) -> (bool, String) {
    let flag = read_bool(map, "isNegative", false);
    if legacy {
        let (prefixed, content) = split_sign(raw);
        (prefixed || flag, content)
    } else {
        (flag, raw.to_string())
    }
}

fn read_node(tree: &mut Composition, parent: Parent, value: &Value, legacy: bool) {
    let Some(map) = value.as_object() else {
        debug!("skipping non-object node entry");
        return;
    };
    let index = usize::MAX;
    match kind_of(map) {
        Some(Kind::Text) => {
            let (negative, text) = read_signed(map, read_str(map, "text"), legacy);
            let fragment = Fragment {
                enabled: read_bool(map, "enabled", true),
                text,
                factor: read_factor(map),
                negative,
            };
            if let Err(e) = tree.insert_node(NodeData::Fragment(fragment), parent, index) {
                debug!("skipping text entry: {}", e);
            }
        }
        Some(Kind::Group) => {
            let (negative, name) = read_signed(map, read_str(map, "name"), legacy);
            let group = Group {
                enabled: read_bool(map, "enabled", true),
                name: non_blank_name(&name),
                factor: read_factor(map),
                negative,
            };
            let Ok(id) = tree.insert_node(NodeData::Group(group), parent, index) else {
                return;
            };
            if map.contains_key("children") || map.contains_key("childs") {
                for child in first_array(map, &["children", "childs"]) {
                    read_node(tree, Parent::Group(id), child, legacy);
                }
            } else {
                // groups-only era: texts first, then sub-groups
                let texts = map
                    .get("texts")
                    .and_then(Value::as_object)
                    .map(|t| array_at(t, "texts"))
                    .unwrap_or(&[]);
                for child in texts.iter().chain(array_at(map, "groups")) {
                    read_node(tree, Parent::Group(id), child, legacy);
                }
            }
        }
        None => debug!("skipping node with unknown type"),
    }
}

/// Serialize the tree as JSON text.
pub fn to_json(tree: &Composition, pretty: bool) -> Result<String, SnapshotError> {
    let object = to_object(tree);
    let text = if pretty {
        serde_json::to_string_pretty(&object)?
    } else {
        serde_json::to_string(&object)?
    };
    Ok(text)
}

/// Parse JSON text into a tree. Fails only when the text is not JSON at all.
pub fn from_json(text: &str) -> Result<Composition, SnapshotError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(from_value(&value))
}

/// Equal ignoring ids.
pub fn structurally_equal(a: &Composition, b: &Composition) -> bool {
    to_object(a).without_ids() == to_object(b).without_ids()
}
