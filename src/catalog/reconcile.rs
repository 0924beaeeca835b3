//! Merging a persisted record set with a fresh file-system scan.
//!
//! The catalog is expected to drift from the file system between runs; this
//! pass absorbs the drift. Nothing here fails: every discrepancy resolves to
//! keeping, re-linking, or dropping a record.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::catalog::record::{Fingerprint, ImageRecord};
use crate::scan::ImageMetadataProvider;
use crate::tags::Taxonomy;

/// A not-yet-cataloged file, its fingerprint computed at most once.
struct Candidate {
    path: PathBuf,
    fingerprint: Option<Option<Fingerprint>>,
    claimed: bool,
}

impl Candidate {
    fn fingerprint(&mut self, probe: &dyn ImageMetadataProvider) -> Option<Fingerprint> {
        *self
            .fingerprint
            .get_or_insert_with(|| Fingerprint::probe(&self.path, probe))
    }
}

/// Produce the updated record set for one scan.
///
/// - Files with an ignored extension never enter the catalog; a previous
///   record pointing at one is dropped outright.
/// - A record whose path still exists survives untouched.
/// - A record whose path vanished is matched against the uncataloged files
///   by fingerprint; the first match (files in enumeration order) re-links
///   the record to the new path with tags and added-time intact. Without a
///   match the record is dropped, tags included. That loss is accepted:
///   nothing ties a vanished path to any particular new file beyond the
///   fingerprint.
/// - Files left over become fresh untagged records stamped `now`.
///
/// When several vanished records share a fingerprint, they claim matching
/// files in iteration order of `previous`. The ambiguity is inherent to
/// fingerprinting; order makes the outcome deterministic.
///
/// Candidate fingerprints are probed lazily, so a run over a directory of
/// already-cataloged files decodes nothing.
pub fn reconcile(
    previous: Vec<ImageRecord>,
    current_files: &[PathBuf],
    taxonomy: &Taxonomy,
    probe: &dyn ImageMetadataProvider,
    now: NaiveDateTime,
) -> Vec<ImageRecord> {
    let files: Vec<&PathBuf> = current_files
        .iter()
        .filter(|path| !taxonomy.is_ignored(path))
        .collect();
    let present: HashSet<&Path> = files.iter().map(|p| p.as_path()).collect();

    let mut result = Vec::new();
    let mut missing = Vec::new();
    let mut cataloged: HashSet<PathBuf> = HashSet::new();

    for record in previous {
        if taxonomy.is_ignored(record.path()) {
            // The taxonomy no longer admits this extension; no rescue
            warn!("dropping {}: extension now ignored", record.path().display());
        } else if present.contains(record.path()) {
            cataloged.insert(record.path().to_path_buf());
            result.push(record);
        } else {
            missing.push(record);
        }
    }

    let mut candidates: Vec<Candidate> = files
        .into_iter()
        .filter(|path| !cataloged.contains(path.as_path()))
        .map(|path| Candidate {
            path: path.clone(),
            fingerprint: None,
            claimed: false,
        })
        .collect();

    let mut rescued = 0usize;
    let mut dropped = 0usize;
    for record in missing {
        let Some(wanted) = record.fingerprint() else {
            warn!(
                "dropping {}: vanished with no fingerprint to match by",
                record.path().display()
            );
            dropped += 1;
            continue;
        };

        let mut matched = None;
        for candidate in candidates.iter_mut() {
            if candidate.claimed {
                continue;
            }
            if candidate.fingerprint(probe) == Some(wanted) {
                matched = Some(candidate);
                break;
            }
        }

        match matched {
            Some(candidate) => {
                candidate.claimed = true;
                debug!(
                    "re-linking {} -> {}",
                    record.path().display(),
                    candidate.path.display()
                );
                result.push(record.relocated(candidate.path.clone()));
                rescued += 1;
            }
            None => {
                warn!(
                    "dropping {}: vanished, no file matches its fingerprint",
                    record.path().display()
                );
                dropped += 1;
            }
        }
    }

    let mut added = 0usize;
    for candidate in candidates.into_iter().filter(|c| !c.claimed) {
        result.push(ImageRecord::new(candidate.path, now));
        added += 1;
    }

    info!(
        "reconciled: {} kept, {} re-linked, {} dropped, {} new",
        result.len() - rescued - added,
        rescued,
        dropped,
        added
    );
    result
}
