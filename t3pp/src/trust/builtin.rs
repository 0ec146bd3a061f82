// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! The compiled-in publisher trust store.

use super::{normalize_fingerprint, TrustProvider};

/// Fingerprints of the official release publishers.
const RELEASE_FINGERPRINTS: &[&str] =
    &["30BE046EE05B4F37452E9D813FD5A1D33C2440E8AB6AA52D31D0DAED5BBA8326"];

/// Fingerprints of development publishers. These are only compiled into debug builds with the
/// `dev-roots` feature, and never into a release build.
#[cfg(all(feature = "dev-roots", debug_assertions))]
const DEV_FINGERPRINTS: &[&str] = &[];

/// Trusts the fingerprints compiled into this crate.
#[derive(Clone, Debug)]
pub struct BuiltinTrustStore {
    dev_roots: bool,
}

impl BuiltinTrustStore {
    /// The release store. Development fingerprints are enabled whenever they are compiled in.
    pub fn new() -> BuiltinTrustStore {
        BuiltinTrustStore { dev_roots: true }
    }

    /// Enables or disables the development fingerprints. Has no effect when they are not compiled in.
    pub fn with_dev_roots(mut self, enabled: bool) -> BuiltinTrustStore {
        self.dev_roots = enabled;
        self
    }

    /// True if development fingerprints are compiled in and enabled.
    pub fn dev_roots_active(&self) -> bool {
        cfg!(all(feature = "dev-roots", debug_assertions)) && self.dev_roots
    }

    #[cfg(all(feature = "dev-roots", debug_assertions))]
    fn is_dev_trusted(&self, fingerprint: &str) -> bool {
        self.dev_roots && DEV_FINGERPRINTS.iter().any(|f| f.eq_ignore_ascii_case(fingerprint))
    }

    #[cfg(not(all(feature = "dev-roots", debug_assertions)))]
    fn is_dev_trusted(&self, _fingerprint: &str) -> bool {
        false
    }
}

impl Default for BuiltinTrustStore {
    fn default() -> Self {
        BuiltinTrustStore::new()
    }
}

impl TrustProvider for BuiltinTrustStore {
    fn is_trusted(&self, fingerprint: &str) -> bool {
        let fingerprint = match normalize_fingerprint(fingerprint) {
            Some(f) => f,
            None => return false,
        };
        RELEASE_FINGERPRINTS
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&fingerprint))
            || self.is_dev_trusted(&fingerprint)
    }
}
