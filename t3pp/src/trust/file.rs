// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! A trust store read from a JSON file.
//!
//! The file holds either a plain array of fingerprints, or an object with a `fingerprints` array:
//!
//! `````text
//! ["30BE046E...", "..."]
//! {"fingerprints": ["30BE046E...", "..."]}
//! `````

use super::{normalize_fingerprint, TrustProvider};
use crate::package::error::{Error, PatchErrorKind};
use crate::package::{open_existing, Result};
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::BufReader;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum TrustFile {
    List(Vec<String>),
    Object { fingerprints: Vec<String> },
}

/// A fixed set of trusted fingerprints.
#[derive(Clone, Debug, Default)]
pub struct FileTrustStore {
    fingerprints: HashSet<String>,
}

impl FileTrustStore {
    /// Builds a store from the given fingerprints. Blank entries are ignored.
    pub fn from_fingerprints<S: AsRef<str>>(fingerprints: &[S]) -> FileTrustStore {
        FileTrustStore {
            fingerprints: fingerprints
                .iter()
                .filter_map(|f| normalize_fingerprint(f.as_ref()))
                .collect(),
        }
    }

    /// Reads a store from a JSON file. A file that is neither a list nor an object with a `fingerprints`
    /// list is rejected with [PatchErrorKind::InvalidFormat].
    pub fn from_file_path(path: &Path) -> Result<FileTrustStore> {
        let file = open_existing(path)?;
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
        let parsed: TrustFile = serde_json::from_value(value)
            .map_err(|_e| Error::PatchError(PatchErrorKind::InvalidFormat))?;
        let fingerprints = match parsed {
            TrustFile::List(list) => list,
            TrustFile::Object { fingerprints } => fingerprints,
        };
        let store = FileTrustStore::from_fingerprints(&fingerprints);
        debug!("Loaded {} trusted fingerprints from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl TrustProvider for FileTrustStore {
    fn is_trusted(&self, fingerprint: &str) -> bool {
        match normalize_fingerprint(fingerprint) {
            Some(f) => self.fingerprints.contains(&f),
            None => false,
        }
    }
}
