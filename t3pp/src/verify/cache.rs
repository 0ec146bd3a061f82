// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Caches the signature-level verification of the most recently verified patch.
//!
//! A host that re-verifies the same patch against a series of targets (for example while a user edits
//! the target path) only needs to rerun the target check. Only the facts that depend on the file alone
//! are cached: the envelope, the fingerprint, and the signature and payload hash results. Trust,
//! certificate validity and the final state are recomputed on every call from the verifier passed in.
//! The cached facts are discarded whenever the patch path, size or modification time changes.

use super::{inspect, Inspection, VerificationReport, Verifier};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq, Eq)]
struct CacheKey {
    path: PathBuf,
    length: u64,
    modified: Option<SystemTime>,
}

impl CacheKey {
    fn for_path(path: &Path) -> Option<CacheKey> {
        let metadata = fs::metadata(path).ok()?;
        Some(CacheKey {
            path: path.to_path_buf(),
            length: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Holds the signature-level facts of the last verified patch.
#[derive(Default)]
pub struct VerificationCache {
    base: Option<(CacheKey, Inspection)>,
}

impl VerificationCache {
    pub fn new() -> VerificationCache {
        VerificationCache::default()
    }

    /// Verifies the patch at `patch_path` against `target_path`, reusing the cached signature-level
    /// facts when the patch file is unchanged. The result is the same as [Verifier::verify] with the
    /// given verifier.
    pub fn verify(
        &mut self,
        verifier: &Verifier,
        patch_path: &Path,
        target_path: Option<&Path>,
    ) -> VerificationReport {
        let base = verifier.assess(&self.inspection(patch_path));
        match &base.manifest {
            Some(manifest) => {
                let (check, issues) = verifier.verify_target_only(target_path, manifest);
                base.with_target(check, issues)
            }
            None => base,
        }
    }

    /// Forgets the cached report.
    pub fn clear(&mut self) {
        self.base = None;
    }

    fn inspection(&mut self, patch_path: &Path) -> Inspection {
        let key = CacheKey::for_path(patch_path);
        if let (Some(key), Some((cached_key, inspection))) = (&key, &self.base) {
            if key == cached_key {
                debug!("Reusing cached verification of {}", patch_path.display());
                return inspection.clone();
            }
        }

        // The legacy marker is always probed here, each verifier masks it according to its options.
        let inspection = inspect(patch_path, true);
        self.base = key.map(|key| (key, inspection.clone()));
        inspection
    }
}
