// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module defines how publisher trust is decided.
//!
//! Trust is never derived from the certificate itself. A publisher is trusted only if the fingerprint of
//! its public key is known to a [TrustProvider]. The verifier takes the provider as an argument, so the
//! set of trusted publishers is always an explicit input rather than process-wide state.
//!
//! The [builtin] store carries the fingerprints compiled into the release. The [file] store reads
//! fingerprints from a JSON document, which suits local deployments and tests. Providers can be
//! combined with [ChainedTrust].

pub mod builtin;
pub mod file;

/// Decides whether a publisher fingerprint is trusted.
pub trait TrustProvider {
    /// Returns true if the given fingerprint (hex, any case) belongs to a trusted publisher.
    ///
    /// Blank fingerprints are never trusted.
    fn is_trusted(&self, fingerprint: &str) -> bool;
}

/// Trusts a fingerprint if any of the wrapped providers trusts it.
pub struct ChainedTrust<'a> {
    providers: Vec<&'a dyn TrustProvider>,
}

impl<'a> ChainedTrust<'a> {
    pub fn new(providers: Vec<&'a dyn TrustProvider>) -> ChainedTrust<'a> {
        ChainedTrust { providers }
    }
}

impl<'a> TrustProvider for ChainedTrust<'a> {
    fn is_trusted(&self, fingerprint: &str) -> bool {
        self.providers.iter().any(|p| p.is_trusted(fingerprint))
    }
}

/// Normalizes a fingerprint for set membership: trimmed and uppercase. Returns `None` for blank input.
pub(crate) fn normalize_fingerprint(fingerprint: &str) -> Option<String> {
    let trimmed = fingerprint.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}
