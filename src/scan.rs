//! File-system collaborators: directory enumeration and image probing.
//!
//! Both are traits so reconciliation can run against stubs in tests; the
//! provided implementations are the only places the crate touches `walkdir`
//! or the `image` decoder.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Why a probe could not produce pixel dimensions.
///
/// Neither variant is fatal anywhere in the crate: a file that cannot be
/// probed simply has no fingerprint and keeps path-only identity.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The bytes at the path do not decode as a known image format.
    #[error("not a decodable image")]
    NotAnImage,

    /// The file could not be read at all.
    #[error("unreadable: {0}")]
    Unreadable(#[from] io::Error),
}

/// Recursive listing of the regular files under a directory.
pub trait DirectoryEnumerator {
    /// Every regular file below `root`, any extension, directories excluded.
    fn list(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Pixel-dimension lookup for a candidate image file.
pub trait ImageMetadataProvider {
    /// `(width, height)` of the image at `path`.
    fn probe(&self, path: &Path) -> Result<(u32, u32), ProbeError>;
}

/// [`DirectoryEnumerator`] backed by a `walkdir` traversal.
#[derive(Debug, Default)]
pub struct FsEnumerator;

impl DirectoryEnumerator for FsEnumerator {
    fn list(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    // Unreadable subtrees reduce the scan, they don't abort it
                    debug!("skipping unreadable entry under {}: {}", root.display(), error);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// [`ImageMetadataProvider`] that reads dimensions from the image header.
///
/// `image::image_dimensions` stops after the header, so probing never pays
/// for a full pixel decode.
#[derive(Debug, Default)]
pub struct ImageProbe;

impl ImageMetadataProvider for ImageProbe {
    fn probe(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        match image::image_dimensions(path) {
            Ok(dimensions) => Ok(dimensions),
            Err(image::ImageError::IoError(error)) => Err(ProbeError::Unreadable(error)),
            Err(_) => Err(ProbeError::NotAnImage),
        }
    }
}
