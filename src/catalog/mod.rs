//! The catalog: tagged image records plus the taxonomy they resolve against.

pub mod reconcile;
pub mod record;
pub mod store;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::tags::Taxonomy;
pub use record::{Fingerprint, ImageRecord};

/// Records keyed by file path, paired with exactly one taxonomy.
///
/// Sorted keys make iteration, reconciliation's encounter order, and the
/// persisted document deterministic.
#[derive(Debug)]
pub struct Catalog {
    records: BTreeMap<String, ImageRecord>,
    taxonomy: Taxonomy,
}

impl Catalog {
    /// An empty catalog bound to `taxonomy`.
    pub fn new(taxonomy: Taxonomy) -> Self {
        Catalog {
            records: BTreeMap::new(),
            taxonomy,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn taxonomy_mut(&mut self) -> &mut Taxonomy {
        &mut self.taxonomy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in path order.
    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ImageRecord> {
        self.records.values_mut()
    }

    pub fn record(&self, path: &Path) -> Option<&ImageRecord> {
        self.records.get(&key_for(path))
    }

    pub fn record_mut(&mut self, path: &Path) -> Option<&mut ImageRecord> {
        self.records.get_mut(&key_for(path))
    }

    /// Insert or replace the record at its own path.
    pub fn insert(&mut self, record: ImageRecord) {
        self.records.insert(key_for(record.path()), record);
    }

    pub fn remove(&mut self, path: &Path) -> Option<ImageRecord> {
        self.records.remove(&key_for(path))
    }

    /// Drain every record in path order, leaving the catalog empty.
    pub fn take_records(&mut self) -> Vec<ImageRecord> {
        std::mem::take(&mut self.records).into_values().collect()
    }

    /// Replace the whole record set, re-keying each record by its path.
    pub fn replace_records(&mut self, records: Vec<ImageRecord>) {
        self.records.clear();
        for record in records {
            self.insert(record);
        }
    }

    /// Encode the record set as the persisted details document.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for (key, record) in &self.records {
            doc.insert(key.clone(), record.to_document(self.taxonomy.tags()));
        }
        Value::Object(doc)
    }

    /// Decode a details document against `taxonomy`.
    ///
    /// An entry that does not parse is skipped with a warning: one corrupt
    /// record must not discard every other record's tags. A document that is
    /// not an object at all still fails the load.
    pub fn from_document(taxonomy: Taxonomy, value: &Value) -> Result<Self> {
        let entries: Map<String, Value> = serde_json::from_value(value.clone())?;
        let mut catalog = Catalog::new(taxonomy);
        for (key, entry) in &entries {
            match ImageRecord::from_document(entry, catalog.taxonomy.tags()) {
                Ok(record) => catalog.insert(record),
                Err(error) => warn!("skipping catalog entry {:?}: {}", key, error),
            }
        }
        Ok(catalog)
    }
}

fn key_for(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format;
    use serde_json::json;
    use std::path::PathBuf;

    fn noon() -> chrono::NaiveDateTime {
        format::parse_timestamp("2024/03/01 12:00:00").unwrap()
    }

    #[test]
    fn test_insert_and_lookup_by_path() {
        let mut catalog = Catalog::new(Taxonomy::starter());
        catalog.insert(ImageRecord::new(PathBuf::from("/pics/b.jpg"), noon()));
        catalog.insert(ImageRecord::new(PathBuf::from("/pics/a.jpg"), noon()));

        assert_eq!(catalog.len(), 2);
        assert!(catalog.record(Path::new("/pics/a.jpg")).is_some());
        assert!(catalog.record(Path::new("/pics/c.jpg")).is_none());

        let order: Vec<String> = catalog.records().map(|r| r.file_name()).collect();
        assert_eq!(order, ["a.jpg", "b.jpg"], "iteration is path-sorted");
    }

    #[test]
    fn test_take_and_replace_records() {
        let mut catalog = Catalog::new(Taxonomy::starter());
        catalog.insert(ImageRecord::new(PathBuf::from("/pics/a.jpg"), noon()));

        let drained = catalog.take_records();
        assert_eq!(drained.len(), 1);
        assert!(catalog.is_empty());

        catalog.replace_records(drained);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_document_round_trip() {
        let taxonomy = Taxonomy::starter();
        let jpg = taxonomy.find_tag("JPG").unwrap();
        let mut catalog = Catalog::new(taxonomy);
        let mut record = ImageRecord::new(PathBuf::from("/pics/cat.jpg"), noon());
        record.add_tag(jpg);
        catalog.insert(record);

        let doc = catalog.to_document();
        assert!(doc.get("/pics/cat.jpg").is_some(), "keyed by path");

        let restored = Catalog::from_document(Taxonomy::starter(), &doc).unwrap();
        assert_eq!(restored.len(), 1);
        let record = restored.record(Path::new("/pics/cat.jpg")).unwrap();
        assert_eq!(record.tags().len(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_skipped_not_fatal() {
        let doc = json!({
            "/pics/good.jpg": {
                "FILENAME": "good.jpg",
                "FILEPATH": "/pics/good.jpg",
                "ADDEDTIME": "2024/03/01 12:00:00",
                "TAGS": [],
                "IDENTITY": null
            },
            "/pics/bad.jpg": {"FILEPATH": "/pics/bad.jpg"}
        });
        let catalog = Catalog::from_document(Taxonomy::starter(), &doc).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.record(Path::new("/pics/good.jpg")).is_some());
    }

    #[test]
    fn test_non_object_document_is_fatal() {
        assert!(Catalog::from_document(Taxonomy::starter(), &json!([])).is_err());
    }
}
