//! The taxonomy: a tree of assignable tags plus the ignored-extension list.

pub mod codec;
pub mod tree;

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
pub use tree::{TagId, TagTree};

/// Top-level key of the tag tree in the taxonomy document.
pub const TAG_TREE_KEY: &str = "TagTree";
/// Top-level key of the ignored-extension tree in the taxonomy document.
pub const IGNORED_EXTENSION_KEY: &str = "IgnoredExtension";

/// Extensions recognized as images by the default taxonomy.
const DEFAULT_EXTENSIONS: [&str; 5] = ["JPG", "JPEG", "PNG", "BMP", "GIF"];
/// Extensions excluded from cataloging by default. The empty string stands
/// for files without an extension.
const DEFAULT_IGNORED: [&str; 6] = ["ZIP", "RAR", "7Z", "EXE", "JSON", ""];

/// The hierarchical set of valid tag names plus the ignored-extension list.
///
/// Exactly one `Taxonomy` is paired with a catalog; every record's tag ids
/// resolve against its tag tree.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    tags: TagTree,
    ignored: TagTree,
}

impl Taxonomy {
    /// The starter taxonomy written on first initialization: an `Extension`
    /// group with the common image formats, and the stock ignored list.
    pub fn starter() -> Self {
        let mut tags = TagTree::new(TAG_TREE_KEY);
        let extension = tags.append(tags.root(), "Extension");
        for name in DEFAULT_EXTENSIONS {
            tags.append(extension, name);
        }

        let mut ignored = TagTree::new(IGNORED_EXTENSION_KEY);
        for name in DEFAULT_IGNORED {
            ignored.append(ignored.root(), name);
        }

        Taxonomy { tags, ignored }
    }

    /// Build a taxonomy from already-constructed trees.
    pub fn new(tags: TagTree, ignored: TagTree) -> Self {
        Taxonomy { tags, ignored }
    }

    pub fn tags(&self) -> &TagTree {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagTree {
        &mut self.tags
    }

    pub fn ignored(&self) -> &TagTree {
        &self.ignored
    }

    pub fn ignored_mut(&mut self) -> &mut TagTree {
        &mut self.ignored
    }

    /// First tag named `name` in the tag tree, if any.
    pub fn find_tag(&self, name: &str) -> Option<TagId> {
        self.tags.find(name)
    }

    /// Every assignable tag (reachable leaf of the tag tree). The root is
    /// structural and never counts, even when it has no children.
    pub fn tag_leaves(&self) -> Vec<TagId> {
        let root = self.tags.root();
        self.tags
            .leaves()
            .into_iter()
            .filter(|&id| id != root)
            .collect()
    }

    /// The ignored extensions, uppercased for case-insensitive matching.
    pub fn ignored_extensions(&self) -> HashSet<String> {
        let root = self.ignored.root();
        self.ignored
            .leaves()
            .into_iter()
            .filter(|&id| id != root)
            .map(|id| self.ignored.name(id).to_uppercase())
            .collect()
    }

    /// Whether `path` carries an ignored extension. A file without an
    /// extension matches the empty-string entry.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase())
            .unwrap_or_default();
        self.ignored_extensions().contains(&extension)
    }

    /// Decode the persisted taxonomy document.
    ///
    /// Each top-level key is optional: encoding omits a tree whose root has
    /// no children, so absence decodes back to a bare root.
    pub fn from_document(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| Error::MalformedTaxonomy {
            path: "(document)".into(),
            reason: "taxonomy document is not a JSON object".into(),
        })?;

        let tags = match object.get(TAG_TREE_KEY) {
            Some(doc) => codec::decode(doc)?,
            None => TagTree::new(TAG_TREE_KEY),
        };
        let ignored = match object.get(IGNORED_EXTENSION_KEY) {
            Some(doc) => codec::decode(doc)?,
            None => TagTree::new(IGNORED_EXTENSION_KEY),
        };

        Ok(Taxonomy { tags, ignored })
    }

    /// Encode the persisted taxonomy document. A childless tree is omitted
    /// rather than serialized (leaves have no standalone representation).
    pub fn to_document(&self) -> Result<Value> {
        let mut document = Map::new();
        if let Some(doc) = codec::encode(&self.tags)? {
            document.insert(TAG_TREE_KEY.into(), doc);
        }
        if let Some(doc) = codec::encode(&self.ignored)? {
            document.insert(IGNORED_EXTENSION_KEY.into(), doc);
        }
        Ok(Value::Object(document))
    }
}
