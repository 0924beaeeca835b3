//! Tag-based image cataloging with move-aware folder rescans.
//!
//! The crate keeps three things consistent across repeated runs: a
//! hierarchical tag taxonomy, a persisted catalog of tagged files, and the
//! actual contents of a working folder. A run loads both documents, rescans
//! the folder, and reconciles the record set against what it finds: new
//! files enter untagged, vanished files are re-linked by content fingerprint
//! when they merely moved, and dropped when they are truly gone.
//!
//! The embedding application owns the process surface: entry point, argument
//! handling, any UI, and the log subscriber (events are emitted through the
//! `tracing` facade).

pub mod catalog;
pub mod error;
pub mod format;
pub mod scan;
pub mod tags;

pub use catalog::store::Library;
pub use catalog::{Catalog, Fingerprint, ImageRecord};
pub use error::{Error, Result};
pub use scan::{
    DirectoryEnumerator, FsEnumerator, ImageMetadataProvider, ImageProbe, ProbeError,
};
pub use tags::{TagId, TagTree, Taxonomy};
