//! Per-file catalog records and their content fingerprint.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format;
use crate::scan::ImageMetadataProvider;
use crate::tags::{TagId, TagTree};

const KEY_FILENAME: &str = "FILENAME";
const KEY_FILEPATH: &str = "FILEPATH";
const KEY_ADDEDTIME: &str = "ADDEDTIME";
const KEY_TAGS: &str = "TAGS";
const KEY_IDENTITY: &str = "IDENTITY";

/// Best-effort content identity of an image file.
///
/// Derived from the file name, byte size, and pixel dimensions; two files
/// with the same name, size, and dimensions are treated as the same image.
/// That makes the fingerprint good enough to re-link a file that moved to
/// another directory, and no better. Truncated SHA-256 keeps the value
/// stable across runs and platforms, which matters because it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Derive a fingerprint from the identity inputs.
    pub fn compute(file_name: &str, file_size: u64, width: u32, height: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(file_name.as_bytes());
        hasher.update(file_size.to_le_bytes());
        hasher.update(width.to_le_bytes());
        hasher.update(height.to_le_bytes());
        let digest = hasher.finalize();
        let mut truncated = [0u8; 8];
        truncated.copy_from_slice(&digest[..8]);
        Fingerprint(u64::from_le_bytes(truncated))
    }

    /// Fingerprint the file at `path`, asking `probe` for dimensions.
    ///
    /// `None` when the file has no name, cannot be stat-ed, or does not
    /// probe as an image; the caller falls back to path-only identity.
    pub fn probe(path: &Path, probe: &dyn ImageMetadataProvider) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        let size = fs::metadata(path).ok()?.len();
        match probe.probe(path) {
            Ok((width, height)) => Some(Fingerprint::compute(&name, size, width, height)),
            Err(error) => {
                debug!("no fingerprint for {}: {}", path.display(), error);
                None
            }
        }
    }

    fn to_value(self) -> Value {
        Value::Number(self.0.into())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().map(Fingerprint)
    }
}

/// One cataloged file: where it is, when it arrived, and what it is tagged.
///
/// Tag ids resolve against the taxonomy the catalog was loaded with. The
/// fingerprint is filled in lazily, never at construction.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    path: PathBuf,
    added_at: NaiveDateTime,
    tags: Vec<TagId>,
    fingerprint: Option<Fingerprint>,
}

impl ImageRecord {
    /// A freshly sighted file: no tags, no fingerprint yet.
    pub fn new(path: PathBuf, added_at: NaiveDateTime) -> Self {
        ImageRecord {
            path,
            added_at,
            tags: Vec::new(),
            fingerprint: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn added_at(&self) -> NaiveDateTime {
        self.added_at
    }

    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// The same image at a new path, everything else carried forward.
    pub fn relocated(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Assign a tag. Returns `false` when the record already carries it.
    pub fn add_tag(&mut self, tag: TagId) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Unassign a tag. Returns whether it was present.
    pub fn remove_tag(&mut self, tag: TagId) -> bool {
        match self.tags.iter().position(|&t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    /// Unassign the first carried tag whose name matches.
    pub fn remove_tag_named(&mut self, tree: &TagTree, name: &str) -> bool {
        match self.tags.iter().position(|&t| tree.name(t) == name) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    /// Compute and cache the fingerprint if it is not already known.
    pub fn ensure_fingerprint(&mut self, probe: &dyn ImageMetadataProvider) -> Option<Fingerprint> {
        if self.fingerprint.is_none() {
            self.fingerprint = Fingerprint::probe(&self.path, probe);
        }
        self.fingerprint
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name with the final extension stripped.
    pub fn file_name_without_extension(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn file_size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Human-readable file size, or `unknown` when the file is unreadable.
    pub fn formatted_file_size(&self) -> String {
        match self.file_size() {
            Ok(size) => format::format_file_size(size),
            Err(_) => "unknown".to_string(),
        }
    }

    /// Encode as a catalog entry document; tag ids become tag names.
    pub fn to_document(&self, tree: &TagTree) -> Value {
        let mut doc = Map::new();
        doc.insert(KEY_FILENAME.into(), Value::String(self.file_name()));
        doc.insert(
            KEY_FILEPATH.into(),
            Value::String(self.path.to_string_lossy().into_owned()),
        );
        doc.insert(
            KEY_ADDEDTIME.into(),
            Value::String(format::format_timestamp(self.added_at)),
        );
        let names: Vec<Value> = self
            .tags
            .iter()
            .map(|&t| Value::String(tree.name(t).to_string()))
            .collect();
        doc.insert(KEY_TAGS.into(), Value::Array(names));
        doc.insert(
            KEY_IDENTITY.into(),
            self.fingerprint.map_or(Value::Null, Fingerprint::to_value),
        );
        Value::Object(doc)
    }

    /// Decode a catalog entry document, resolving tag names against `tree`.
    ///
    /// A tag name the tree does not contain is dropped with a warning, never
    /// an error: the record set must load even when the taxonomy has moved
    /// on. `FILENAME` on the wire is redundant with `FILEPATH` and ignored.
    pub fn from_document(value: &Value, tree: &TagTree) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| malformed("(entry)", "record is not a JSON object"))?;

        let path = object
            .get(KEY_FILEPATH)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("(entry)", "missing or non-string FILEPATH"))?;

        let added_text = object
            .get(KEY_ADDEDTIME)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(path, "missing or non-string ADDEDTIME"))?;
        let added_at = format::parse_timestamp(added_text)
            .map_err(|e| malformed(path, format!("bad ADDEDTIME: {}", e)))?;

        let tag_names = object
            .get(KEY_TAGS)
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(path, "missing or non-list TAGS"))?;

        let mut tags = Vec::new();
        for entry in tag_names {
            let Some(name) = entry.as_str() else {
                continue;
            };
            match tree.find(name) {
                Some(tag) if !tags.contains(&tag) => tags.push(tag),
                Some(_) => {}
                None => warn!("dropping unknown tag {:?} on {}", name, path),
            }
        }

        let fingerprint = object.get(KEY_IDENTITY).and_then(Fingerprint::from_value);

        Ok(ImageRecord {
            path: PathBuf::from(path),
            added_at,
            tags,
            fingerprint,
        })
    }
}

fn malformed(path: &str, reason: impl Into<String>) -> Error {
    Error::MalformedRecord {
        path: path.to_string(),
        reason: reason.into(),
    }
}
