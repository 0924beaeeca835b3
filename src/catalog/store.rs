//! The library facade: one working folder, its metadata documents, and the
//! catalog they persist.
//!
//! All state lives in JSON files inside an `infos/` folder under the working
//! directory. Each save rewrites a document through a temp file and rename,
//! so a failed write leaves the previous document intact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::catalog::{reconcile, Catalog, ImageRecord};
use crate::error::{Error, Result};
use crate::scan::{DirectoryEnumerator, FsEnumerator, ImageMetadataProvider, ImageProbe};
use crate::tags::{TagId, Taxonomy};

/// Metadata folder name under the working folder.
pub const INFO_FOLDER_NAME: &str = "infos";
/// Document identifying which working folder the metadata describes.
pub const BASIC_INFO_FILENAME: &str = "BasicInfo.json";
/// Document holding the taxonomy.
pub const TAGS_FILENAME: &str = "Tags.json";
/// Document holding the record set.
pub const IMAGE_DETAILS_FILENAME: &str = "ImageDetails.json";

/// Wire form of `BasicInfo.json`.
#[derive(Debug, Serialize, Deserialize)]
struct BasicInfo {
    #[serde(rename = "WORKINGFOLDER")]
    working_folder: PathBuf,
}

/// A working folder's catalog, taxonomy, and persistence.
///
/// Assumes exclusive access: nothing locks the metadata folder, and two
/// processes saving into it concurrently can corrupt each other's documents.
pub struct Library {
    working_folder: PathBuf,
    info_folder: PathBuf,
    enumerator: Box<dyn DirectoryEnumerator>,
    probe: Box<dyn ImageMetadataProvider>,
    catalog: Catalog,
}

impl Library {
    /// Open `working_folder` with the stock file-system collaborators.
    pub fn open(working_folder: impl Into<PathBuf>) -> Result<Self> {
        Library::open_with(
            working_folder,
            Box::new(FsEnumerator),
            Box::new(ImageProbe),
        )
    }

    /// Open `working_folder`, creating its metadata folder on first use.
    ///
    /// A metadata folder that names a different working folder fails with
    /// [`Error::WorkingFolderMismatch`] rather than silently describing the
    /// wrong directory. An absent taxonomy document bootstraps the starter
    /// taxonomy; an absent details document starts an empty catalog.
    pub fn open_with(
        working_folder: impl Into<PathBuf>,
        enumerator: Box<dyn DirectoryEnumerator>,
        probe: Box<dyn ImageMetadataProvider>,
    ) -> Result<Self> {
        let working_folder = working_folder.into().canonicalize()?;
        let info_folder = working_folder.join(INFO_FOLDER_NAME);
        fs::create_dir_all(&info_folder)?;

        let basic_info_path = info_folder.join(BASIC_INFO_FILENAME);
        if basic_info_path.exists() {
            let info: BasicInfo = serde_json::from_str(&fs::read_to_string(&basic_info_path)?)?;
            if info.working_folder != working_folder {
                return Err(Error::WorkingFolderMismatch {
                    expected: working_folder,
                    found: info.working_folder,
                });
            }
        } else {
            let info = BasicInfo {
                working_folder: working_folder.clone(),
            };
            write_document(&basic_info_path, &serde_json::to_value(&info)?)?;
        }

        let tags_path = info_folder.join(TAGS_FILENAME);
        let taxonomy = if tags_path.exists() {
            let document: Value = serde_json::from_str(&fs::read_to_string(&tags_path)?)?;
            Taxonomy::from_document(&document)?
        } else {
            info!("no taxonomy at {}, starting from the stock one", tags_path.display());
            Taxonomy::starter()
        };

        let details_path = info_folder.join(IMAGE_DETAILS_FILENAME);
        let catalog = if details_path.exists() {
            let document: Value = serde_json::from_str(&fs::read_to_string(&details_path)?)?;
            Catalog::from_document(taxonomy, &document)?
        } else {
            Catalog::new(taxonomy)
        };

        Ok(Library {
            working_folder,
            info_folder,
            enumerator,
            probe,
            catalog,
        })
    }

    pub fn working_folder(&self) -> &Path {
        &self.working_folder
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        self.catalog.taxonomy()
    }

    pub fn taxonomy_mut(&mut self) -> &mut Taxonomy {
        self.catalog.taxonomy_mut()
    }

    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.catalog.records()
    }

    pub fn record(&self, path: &Path) -> Option<&ImageRecord> {
        self.catalog.record(path)
    }

    pub fn record_mut(&mut self, path: &Path) -> Option<&mut ImageRecord> {
        self.catalog.record_mut(path)
    }

    /// Every assignable tag.
    pub fn all_tag_leaves(&self) -> Vec<TagId> {
        self.catalog.taxonomy().tag_leaves()
    }

    /// First tag with the given name.
    pub fn find_tag(&self, name: &str) -> Option<TagId> {
        self.catalog.taxonomy().find_tag(name)
    }

    /// Re-scan the working folder and reconcile the record set against it.
    ///
    /// The metadata folder itself is never cataloged, whatever the active
    /// taxonomy ignores.
    pub fn refresh(&mut self, now: NaiveDateTime) -> Result<()> {
        let mut files = self.enumerator.list(&self.working_folder)?;
        files.retain(|path| !path.starts_with(&self.info_folder));

        let previous = self.catalog.take_records();
        let reconciled = reconcile::reconcile(
            previous,
            &files,
            self.catalog.taxonomy(),
            self.probe.as_ref(),
            now,
        );
        self.catalog.replace_records(reconciled);
        Ok(())
    }

    /// Persist all three metadata documents.
    ///
    /// Records without a fingerprint are probed once first, so a file moved
    /// before the next run can still be re-linked.
    pub fn save(&mut self) -> Result<()> {
        for record in self.catalog.records_mut() {
            record.ensure_fingerprint(self.probe.as_ref());
        }

        let taxonomy_document = self.catalog.taxonomy().to_document()?;
        write_document(&self.info_folder.join(TAGS_FILENAME), &taxonomy_document)?;
        write_document(
            &self.info_folder.join(IMAGE_DETAILS_FILENAME),
            &self.catalog.to_document(),
        )?;
        let info = BasicInfo {
            working_folder: self.working_folder.clone(),
        };
        write_document(
            &self.info_folder.join(BASIC_INFO_FILENAME),
            &serde_json::to_value(&info)?,
        )?;
        info!("saved {} records to {}", self.catalog.len(), self.info_folder.display());
        Ok(())
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("working_folder", &self.working_folder)
            .field("records", &self.catalog.len())
            .finish()
    }
}

/// Write `value` to `path` through a temp file and rename.
fn write_document(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let temp = path.with_extension("json.tmp");
    let persist = |error| Error::Persistence {
        file: path.to_path_buf(),
        source: error,
    };
    fs::write(&temp, text).map_err(persist)?;
    fs::rename(&temp, path).map_err(persist)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format;
    use crate::scan::ProbeError;

    /// Probe that trusts extensions: jpg/png files are 640x480 images.
    struct ExtensionProbe;

    impl ImageMetadataProvider for ExtensionProbe {
        fn probe(&self, path: &Path) -> std::result::Result<(u32, u32), ProbeError> {
            match path.extension().and_then(|e| e.to_str()) {
                Some("jpg") | Some("png") => Ok((640, 480)),
                _ => Err(ProbeError::NotAnImage),
            }
        }
    }

    fn open_stubbed(folder: &Path) -> Library {
        Library::open_with(folder, Box::new(FsEnumerator), Box::new(ExtensionProbe)).unwrap()
    }

    fn noon() -> NaiveDateTime {
        format::parse_timestamp("2024/03/01 12:00:00").unwrap()
    }

    fn later() -> NaiveDateTime {
        format::parse_timestamp("2024/03/02 09:30:00").unwrap()
    }

    #[test]
    fn test_open_initializes_metadata_folder() {
        let dir = tempfile::tempdir().unwrap();
        let library = open_stubbed(dir.path());

        assert!(dir.path().join("infos").join("BasicInfo.json").exists());
        assert!(library.catalog().is_empty());
        // Stock taxonomy until the folder gets its own
        assert!(library.find_tag("JPG").is_some());
    }

    #[test]
    fn test_open_rejects_foreign_metadata_folder() {
        let dir = tempfile::tempdir().unwrap();
        let infos = dir.path().join("infos");
        fs::create_dir_all(&infos).unwrap();
        fs::write(
            infos.join("BasicInfo.json"),
            r#"{"WORKINGFOLDER": "/somewhere/else"}"#,
        )
        .unwrap();

        match Library::open_with(
            dir.path(),
            Box::new(FsEnumerator),
            Box::new(ExtensionProbe),
        ) {
            Err(Error::WorkingFolderMismatch { found, .. }) => {
                assert_eq!(found, PathBuf::from("/somewhere/else"));
            }
            other => panic!("expected WorkingFolderMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_first_scan_example_scenario() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat.jpg"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("data.zip"), vec![0u8; 200]).unwrap();

        let mut library = open_stubbed(dir.path());
        library.refresh(noon()).unwrap();

        assert_eq!(library.catalog().len(), 1);
        let record = library.records().next().unwrap();
        assert_eq!(record.file_name(), "cat.jpg");
        assert!(record.tags().is_empty());
        assert_eq!(record.added_at(), noon());
    }

    #[test]
    fn test_metadata_folder_is_never_cataloged() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = open_stubbed(dir.path());
        // A PNG inside infos/ would pass the extension filter
        fs::write(
            dir.path().join("infos").join("orphan.png"),
            vec![0u8; 50],
        )
        .unwrap();

        library.refresh(noon()).unwrap();
        assert!(library.catalog().is_empty());
    }

    #[test]
    fn test_save_then_reopen_preserves_tags() {
        let dir = tempfile::tempdir().unwrap();
        let cat = dir.path().join("cat.jpg");
        fs::write(&cat, vec![0u8; 100]).unwrap();

        let mut library = open_stubbed(dir.path());
        library.refresh(noon()).unwrap();
        let jpg = library.find_tag("JPG").unwrap();
        let canonical = cat.canonicalize().unwrap();
        library.record_mut(&canonical).unwrap().add_tag(jpg);
        library.save().unwrap();

        let reopened = open_stubbed(dir.path());
        assert_eq!(reopened.catalog().len(), 1);
        let record = reopened.record(&canonical).unwrap();
        assert_eq!(record.added_at(), noon());
        let jpg = reopened.find_tag("JPG").unwrap();
        assert_eq!(record.tags(), &[jpg]);
        // Save backfilled the fingerprint for later move matching
        assert!(record.fingerprint().is_some());
    }

    #[test]
    fn test_refresh_after_move_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let cat = dir.path().join("cat.jpg");
        fs::write(&cat, vec![0u8; 100]).unwrap();

        let mut library = open_stubbed(dir.path());
        library.refresh(noon()).unwrap();
        let jpg = library.find_tag("JPG").unwrap();
        let canonical = cat.canonicalize().unwrap();
        library.record_mut(&canonical).unwrap().add_tag(jpg);
        library.save().unwrap();

        // Move the file between runs
        let sorted = dir.path().join("sorted");
        fs::create_dir(&sorted).unwrap();
        fs::rename(&cat, sorted.join("cat.jpg")).unwrap();

        let mut library = open_stubbed(dir.path());
        let jpg = library.find_tag("JPG").unwrap();
        library.refresh(later()).unwrap();

        assert_eq!(library.catalog().len(), 1);
        let record = library.records().next().unwrap();
        assert!(record.path().ends_with("sorted/cat.jpg"));
        assert_eq!(record.tags(), &[jpg]);
        assert_eq!(record.added_at(), noon());
    }

    #[test]
    fn test_refresh_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat.jpg"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("dog.png"), vec![0u8; 200]).unwrap();

        let mut library = open_stubbed(dir.path());
        library.refresh(noon()).unwrap();
        let first: Vec<(PathBuf, NaiveDateTime)> = library
            .records()
            .map(|r| (r.path().to_path_buf(), r.added_at()))
            .collect();

        library.refresh(later()).unwrap();
        let second: Vec<(PathBuf, NaiveDateTime)> = library
            .records()
            .map(|r| (r.path().to_path_buf(), r.added_at()))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_taxonomy_document_round_trips_through_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = open_stubbed(dir.path());
        let extension = library.taxonomy().find_tag("Extension").unwrap();
        library.taxonomy_mut().tags_mut().append(extension, "WEBP");
        library.save().unwrap();

        let reopened = open_stubbed(dir.path());
        assert!(reopened.find_tag("WEBP").is_some());

        let tags_json = dir.path().join("infos").join("Tags.json");
        let document: Value =
            serde_json::from_str(&fs::read_to_string(tags_json).unwrap()).unwrap();
        assert!(document.get("TagTree").is_some());
        assert!(document.get("IgnoredExtension").is_some());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = open_stubbed(dir.path());
        library.save().unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("infos"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
