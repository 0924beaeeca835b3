//! JSON codec for taxonomy trees.
//!
//! A node serializes as `{TAGNAME, TYPE, CONTAIN}`. `TYPE` is `ARRAY` when
//! the node's children are all leaves (the group collapses to a list of
//! names) and `OBJECT` when the children are themselves subtrees (a map from
//! child name to child document). A childless node never serializes on its
//! own; leaves exist only inside a parent's `CONTAIN`.
//!
//! Decoding is driven by the document structure. Encoding picks the shape by
//! inspecting the first child, which is only sound when siblings are
//! uniformly leaf or non-leaf, so mixed groups are rejected instead of being
//! mis-shaped.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::tags::tree::{TagId, TagTree};

const KEY_TAGNAME: &str = "TAGNAME";
const KEY_TYPE: &str = "TYPE";
const KEY_CONTAIN: &str = "CONTAIN";

const TYPE_OBJECT: &str = "OBJECT";
const TYPE_ARRAY: &str = "ARRAY";

/// Decoded pieces of one node document.
struct NodeParts<'a> {
    name: &'a str,
    is_object: bool,
    contain: &'a Value,
}

fn malformed(path: &str, reason: impl Into<String>) -> Error {
    Error::MalformedTaxonomy {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn node_parts<'a>(value: &'a Value, path: &str) -> Result<NodeParts<'a>> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed(path, "node is not a JSON object"))?;

    let name = object
        .get(KEY_TAGNAME)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(path, "missing or non-string TAGNAME"))?;

    let kind = object
        .get(KEY_TYPE)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(path, "missing or non-string TYPE"))?;

    let is_object = match kind {
        TYPE_OBJECT => true,
        TYPE_ARRAY => false,
        other => {
            return Err(malformed(path, format!("unknown TYPE {:?}", other)));
        }
    };

    let contain = object
        .get(KEY_CONTAIN)
        .ok_or_else(|| malformed(path, "missing CONTAIN"))?;

    Ok(NodeParts {
        name,
        is_object,
        contain,
    })
}

/// Reconstruct a [`TagTree`] from a node document.
///
/// Works through an explicit list of pending subtrees, so document depth is
/// not limited by the call stack.
pub fn decode(value: &Value) -> Result<TagTree> {
    let root_parts = node_parts(value, "(root)")?;
    let mut tree = TagTree::new(root_parts.name);
    let root_path = root_parts.name.to_string();

    // Subtree documents still waiting to be attached, in document order
    let mut pending: VecDeque<(TagId, &Value, String)> = VecDeque::new();
    let root_id = tree.root();
    attach_children(&mut tree, root_id, &root_parts, &root_path, &mut pending)?;

    while let Some((parent, child_value, parent_path)) = pending.pop_front() {
        let parts = node_parts(child_value, &parent_path)?;
        let id = tree.append(parent, parts.name);
        let path = format!("{}/{}", parent_path, parts.name);
        attach_children(&mut tree, id, &parts, &path, &mut pending)?;
    }

    Ok(tree)
}

/// Queue or directly attach the children described by one node document.
fn attach_children<'a>(
    tree: &mut TagTree,
    id: TagId,
    parts: &NodeParts<'a>,
    path: &str,
    pending: &mut VecDeque<(TagId, &'a Value, String)>,
) -> Result<()> {
    if parts.is_object {
        let entries = parts
            .contain
            .as_object()
            .ok_or_else(|| malformed(path, "OBJECT node's CONTAIN is not a map"))?;
        // The map key is ignored; the child's own TAGNAME is authoritative
        for child_value in entries.values() {
            pending.push_back((id, child_value, path.to_string()));
        }
    } else {
        let entries = parts
            .contain
            .as_array()
            .ok_or_else(|| malformed(path, "ARRAY node's CONTAIN is not a list"))?;
        for entry in entries {
            let leaf = entry
                .as_str()
                .ok_or_else(|| malformed(path, "ARRAY node's CONTAIN holds a non-string entry"))?;
            tree.append(id, leaf);
        }
    }
    Ok(())
}

/// Encode a tree as a node document.
///
/// Returns `Ok(None)` when the root is a leaf: a childless node has no
/// standalone representation.
pub fn encode(tree: &TagTree) -> Result<Option<Value>> {
    if tree.is_leaf(tree.root()) {
        return Ok(None);
    }
    let path = tree.name(tree.root()).to_string();
    encode_node(tree, tree.root(), &path).map(Some)
}

fn encode_node(tree: &TagTree, id: TagId, path: &str) -> Result<Value> {
    let children = tree.children(id);
    let first_is_leaf = tree.is_leaf(children[0]);
    if children.iter().any(|&c| tree.is_leaf(c) != first_is_leaf) {
        return Err(Error::MixedSiblings {
            path: path.to_string(),
        });
    }

    let mut doc = Map::new();
    doc.insert(KEY_TAGNAME.into(), Value::String(tree.name(id).to_string()));

    if first_is_leaf {
        let names: Vec<Value> = children
            .iter()
            .map(|&c| Value::String(tree.name(c).to_string()))
            .collect();
        doc.insert(KEY_TYPE.into(), Value::String(TYPE_ARRAY.into()));
        doc.insert(KEY_CONTAIN.into(), Value::Array(names));
    } else {
        let mut contain = Map::new();
        for &child in children {
            let child_path = format!("{}/{}", path, tree.name(child));
            contain.insert(
                tree.name(child).to_string(),
                encode_node(tree, child, &child_path)?,
            );
        }
        doc.insert(KEY_TYPE.into(), Value::String(TYPE_OBJECT.into()));
        doc.insert(KEY_CONTAIN.into(), Value::Object(contain));
    }

    Ok(Value::Object(doc))
}
