// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements patch verification.
//!
//! Verification never fails with an error for a trust outcome. Every outcome, including I/O problems
//! while reading the patch, is reported as a [VerificationReport] whose [VerificationState] tells the
//! caller what to do:
//!
//! - [VerificationState::Verified]: the signature and payload are sound, the publisher is trusted and the
//! certificate is within its validity window.
//! - [VerificationState::Untrusted]: the signature and payload are sound, but the publisher is not trusted
//! or the certificate is not currently valid.
//! - [VerificationState::Invalid]: the patch claims to be signed, but the claim is false or cannot be
//! checked. Callers must not apply the patch.
//! - [VerificationState::Unsigned]: the patch makes no cryptographic claim at all.
//!
//! The target check is reported alongside the state and never changes it.

pub mod cache;
pub mod target;

use crate::cert::{CertificateValidity, PublisherCertificate};
use crate::digest::{hex_digest_eq, sha256_reader};
use crate::package::envelope::{read_signed_patch, SignedPatch};
use crate::package::error::{Error, PatchErrorKind};
use crate::package::manifest::Manifest;
use crate::package::SIGNATURE_ALGORITHM;
use crate::step::LogStep;
use crate::trust::TrustProvider;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::Signature;
use std::fs::File;
use std::io::Read;
use std::path::Path;
pub use target::check_target;

/// The marker that legacy tooling placed near the start of "security" patches. It carries no
/// cryptographic meaning and is only reported for information.
pub const LEGACY_SECURITY_MARKER: &[u8] = b"T3PP-SECURITY";

/// How many leading bytes of a patch are searched for [LEGACY_SECURITY_MARKER].
pub const LEGACY_SCAN_BYTES: usize = 4096;

/// The overall trust classification of a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationState {
    Unsigned,
    Verified,
    Untrusted,
    Invalid,
}

/// The outcome of comparing the target on disk with the target in the manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetCheck {
    NotChecked,
    Match,
    Mismatch,
    Error,
}

/// Everything that was learned while verifying a patch.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationReport {
    pub state: VerificationState,

    /// Human-readable reason when the state is [VerificationState::Invalid].
    pub failure_reason: Option<String>,

    /// Machine-readable counterpart of `failure_reason`, when one applies.
    pub failure: Option<PatchErrorKind>,

    pub has_signature_block: bool,
    pub signature_valid: bool,
    pub payload_hash_valid: bool,
    pub publisher_trusted: bool,
    pub certificate_validity: CertificateValidity,

    /// Fingerprint of the publisher public key, in uppercase hex.
    pub publisher_fingerprint: Option<String>,

    /// The publisher certificate, as read from the envelope.
    pub publisher: Option<PublisherCertificate>,

    /// The manifest, as read from the envelope.
    pub manifest: Option<Manifest>,

    pub target_check: TargetCheck,
    pub target_issues: Vec<String>,

    /// True if an unsigned patch carries [LEGACY_SECURITY_MARKER]. This is never a reason to trust it.
    pub has_legacy_security_mark: bool,
}

impl VerificationReport {
    fn empty(state: VerificationState) -> VerificationReport {
        VerificationReport {
            state,
            failure_reason: None,
            failure: None,
            has_signature_block: false,
            signature_valid: false,
            payload_hash_valid: false,
            publisher_trusted: false,
            certificate_validity: CertificateValidity::Unknown,
            publisher_fingerprint: None,
            publisher: None,
            manifest: None,
            target_check: TargetCheck::NotChecked,
            target_issues: Vec::new(),
            has_legacy_security_mark: false,
        }
    }

    fn unsigned(has_legacy_security_mark: bool) -> VerificationReport {
        VerificationReport {
            has_legacy_security_mark,
            ..VerificationReport::empty(VerificationState::Unsigned)
        }
    }

    fn invalid(failure: Option<PatchErrorKind>, reason: &str) -> VerificationReport {
        VerificationReport {
            failure,
            failure_reason: Some(reason.to_string()),
            ..VerificationReport::empty(VerificationState::Invalid)
        }
    }

    /// Marks this report as a failed verification, keeping the signature-level fields gathered so far.
    fn fail(mut self, failure: PatchErrorKind, reason: &str) -> VerificationReport {
        warn!("Patch verification failed: {}", reason);
        self.state = VerificationState::Invalid;
        self.failure = Some(failure);
        self.failure_reason = Some(reason.to_string());
        self
    }

    /// Returns a copy of this report carrying the given target check result in place of its own.
    pub fn with_target(&self, target_check: TargetCheck, target_issues: Vec<String>) -> VerificationReport {
        VerificationReport {
            target_check,
            target_issues,
            ..self.clone()
        }
    }

    pub fn is_verified(&self) -> bool {
        self.state == VerificationState::Verified
    }

    /// A short label for the state.
    pub fn status_text(&self) -> &'static str {
        match self.state {
            VerificationState::Verified => "Verified",
            VerificationState::Untrusted => "Untrusted",
            VerificationState::Invalid => "Invalid (blocked)",
            VerificationState::Unsigned => "Unsigned",
        }
    }

    /// A short human-readable summary of the report, with up to three sample target issues.
    pub fn summary(&self) -> String {
        let mut summary = match self.state {
            VerificationState::Verified => {
                "Trusted publisher. Signature and payload verified.".to_string()
            }
            VerificationState::Untrusted => {
                "Signed, but the publisher is not trusted (or the certificate is not valid).".to_string()
            }
            VerificationState::Invalid => {
                let mut text =
                    "Signature/payload verification failed. The patch will be blocked.".to_string();
                if let Some(reason) = &self.failure_reason {
                    text.push('\n');
                    text.push_str(reason);
                }
                text
            }
            VerificationState::Unsigned if self.has_legacy_security_mark => {
                "Legacy mark detected, but it is not a cryptographic signature. Treat as unverified."
                    .to_string()
            }
            VerificationState::Unsigned => {
                "No signature. Cannot verify origin or integrity offline.".to_string()
            }
        };

        if self.has_signature_block && self.target_check != TargetCheck::NotChecked {
            summary.push('\n');
            summary.push_str(&self.target_summary());
        }
        summary
    }

    fn target_summary(&self) -> String {
        match self.target_check {
            TargetCheck::Match => "Target check: match.".to_string(),
            TargetCheck::Mismatch if self.target_issues.is_empty() => {
                "Target check: mismatch.".to_string()
            }
            TargetCheck::Mismatch => {
                let mut sample = self
                    .target_issues
                    .iter()
                    .take(3)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if self.target_issues.len() > 3 {
                    sample.push_str(", ...");
                }
                format!("Target check: mismatch ({}).", sample)
            }
            TargetCheck::Error => "Target check: error.".to_string(),
            TargetCheck::NotChecked => String::new(),
        }
    }
}

/// Options that adjust how a [Verifier] behaves.
#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// The instant certificate validity windows are evaluated at. Defaults to the current time.
    pub now: Option<DateTime<Utc>>,

    /// Whether to look for [LEGACY_SECURITY_MARKER] in unsigned patches.
    pub probe_legacy_marker: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            now: None,
            probe_legacy_marker: true,
        }
    }
}

/// Verifies signed patches against a set of trusted publishers.
pub struct Verifier<'a> {
    trust: &'a dyn TrustProvider,
    options: VerifyOptions,
}

impl<'a> Verifier<'a> {
    pub fn new(trust: &'a dyn TrustProvider) -> Verifier<'a> {
        Verifier {
            trust,
            options: VerifyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Verifier<'a> {
        self.options = options;
        self
    }

    /// Verifies the patch at `patch_path`, and checks `target_path` against the manifest if one is given
    /// and the manifest could be read.
    pub fn verify(&self, patch_path: &Path, target_path: Option<&Path>) -> VerificationReport {
        let _step = LogStep::begin("Verify patch");
        let report = self.verify_signature(patch_path);
        match &report.manifest {
            Some(manifest) => {
                let (check, issues) = check_target(target_path, manifest);
                report.with_target(check, issues)
            }
            None => report,
        }
    }

    /// Checks the target only, against a manifest obtained from an earlier verification.
    pub fn verify_target_only(
        &self,
        target_path: Option<&Path>,
        manifest: &Manifest,
    ) -> (TargetCheck, Vec<String>) {
        check_target(target_path, manifest)
    }

    /// Verifies the signature and payload of the patch at `patch_path` without any target check.
    pub fn verify_signature(&self, patch_path: &Path) -> VerificationReport {
        self.assess(&inspect(patch_path, self.options.probe_legacy_marker))
    }

    /// Applies this verifier's trust provider and evaluation time to the facts gathered by [inspect].
    fn assess(&self, inspection: &Inspection) -> VerificationReport {
        let mut report = inspection.report.clone();
        report.has_legacy_security_mark =
            self.options.probe_legacy_marker && inspection.legacy_mark;

        if let (Some(fingerprint), Some(certificate)) =
            (&report.publisher_fingerprint, &report.publisher)
        {
            let now = self.options.now.unwrap_or_else(Utc::now);
            report.publisher_trusted = self.trust.is_trusted(fingerprint);
            report.certificate_validity = certificate.validity_at(now);
        }

        if inspection.sound {
            report.state = if report.publisher_trusted
                && report.certificate_validity == CertificateValidity::Valid
            {
                VerificationState::Verified
            } else {
                VerificationState::Untrusted
            };
            info!(
                "Patch signature verified: {:?} (trusted: {}, certificate: {:?})",
                report.state, report.publisher_trusted, report.certificate_validity
            );
        }
        report
    }
}

/// What can be learned about a patch file without a trust provider or an evaluation time.
#[derive(Clone, Debug, PartialEq)]
struct Inspection {
    /// The report so far. Trust, certificate validity and the final state of a sound patch are filled
    /// in by [Verifier::assess].
    report: VerificationReport,

    /// The signature and payload hash both checked out.
    sound: bool,

    legacy_mark: bool,
}

impl Inspection {
    fn done(report: VerificationReport, legacy_mark: bool) -> Inspection {
        Inspection {
            report,
            sound: false,
            legacy_mark,
        }
    }
}

fn inspect(patch_path: &Path, probe_legacy_marker: bool) -> Inspection {
    if !patch_path.is_file() {
        return Inspection::done(
            VerificationReport::invalid(Some(PatchErrorKind::NotFound), "Patch file not found."),
            false,
        );
    }

    let legacy_mark = probe_legacy_marker && has_legacy_marker(patch_path);

    match read_signed_patch(patch_path) {
        Ok(Some(signed)) => Inspection {
            legacy_mark,
            ..inspect_envelope(patch_path, &signed)
        },
        Ok(None) => {
            info!("No signature block found (legacy patch).");
            Inspection::done(VerificationReport::unsigned(legacy_mark), legacy_mark)
        }
        Err(e) => Inspection::done(envelope_error_report(e), legacy_mark),
    }
}

fn inspect_envelope(patch_path: &Path, signed: &SignedPatch) -> Inspection {
    let envelope = &signed.envelope;
    let certificate = &envelope.publisher;
    let manifest = &envelope.manifest;

    let verifying_key = match certificate.public_key.to_verifying_key() {
        Ok(key) => key,
        Err(e) => {
            error!("Could not parse the publisher public key: {}", e);
            let report = VerificationReport {
                has_signature_block: true,
                ..VerificationReport::invalid(
                    Some(PatchErrorKind::InvalidEnvelope),
                    "Invalid publisher public key.",
                )
            };
            return Inspection::done(report, false);
        }
    };

    let mut report = VerificationReport::empty(VerificationState::Invalid);
    report.has_signature_block = true;
    // The key decoded, so its fingerprint can be computed.
    report.publisher_fingerprint = Some(certificate.fingerprint().unwrap_or_default());
    report.publisher = Some(certificate.clone());
    report.manifest = Some(manifest.clone());

    if !envelope.algorithm.eq_ignore_ascii_case(SIGNATURE_ALGORITHM) {
        let reason = format!("Unsupported signature algorithm: {}", envelope.algorithm);
        return Inspection::done(report.fail(PatchErrorKind::UnsupportedAlgorithm, &reason), false);
    }

    let signature_bytes = match base64::decode(envelope.signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            let report = report.fail(
                PatchErrorKind::InvalidSignatureEncoding,
                "Signature is not valid base64.",
            );
            return Inspection::done(report, false);
        }
    };

    let signature_valid = match Signature::from_slice(&signature_bytes) {
        Ok(signature) => verifying_key
            .verify(&signed.manifest_bytes, &signature)
            .is_ok(),
        Err(e) => {
            error!("Malformed signature: {}", e);
            false
        }
    };
    if !signature_valid {
        let report = report.fail(PatchErrorKind::SignatureInvalid, "Signature verification failed.");
        return Inspection::done(report, false);
    }
    report.signature_valid = true;

    let payload_hash_valid = match hash_payload(patch_path, signed.geometry.payload_length) {
        Ok(actual) if hex_digest_eq(&actual, &manifest.patch_payload_sha256) => true,
        Ok(actual) => {
            error!(
                "Patch payload hash mismatch: manifest={} actual={}",
                manifest.patch_payload_sha256, actual
            );
            false
        }
        Err(e) => {
            error!("Could not hash the patch payload: {}", e);
            false
        }
    };
    if !payload_hash_valid {
        let report = report.fail(PatchErrorKind::PayloadHashMismatch, "Patch payload hash mismatch.");
        return Inspection::done(report, false);
    }
    report.payload_hash_valid = true;

    Inspection {
        report,
        sound: true,
        legacy_mark: false,
    }
}

fn envelope_error_report(e: Error) -> VerificationReport {
    let (has_signature_block, reason) = match e.kind() {
        Some(PatchErrorKind::CorruptFooter) => (true, "Corrupt signature footer."),
        Some(PatchErrorKind::InvalidEnvelope) => (true, "Invalid envelope."),
        _ => (false, "Could not read the patch file."),
    };
    error!("Could not read the signature block: {}", e);
    VerificationReport {
        has_signature_block,
        ..VerificationReport::invalid(e.kind(), reason)
    }
}

fn hash_payload(patch_path: &Path, payload_length: u64) -> std::io::Result<String> {
    let mut file = File::open(patch_path)?;
    sha256_reader(&mut file, payload_length)
}

/// Searches the leading bytes of the file for [LEGACY_SECURITY_MARKER]. Read failures count as absent.
pub fn has_legacy_marker(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let mut head = Vec::with_capacity(LEGACY_SCAN_BYTES);
    if file.take(LEGACY_SCAN_BYTES as u64).read_to_end(&mut head).is_err() {
        return false;
    }
    head.windows(LEGACY_SECURITY_MARKER.len())
        .any(|window| window == LEGACY_SECURITY_MARKER)
}

#[cfg(test)]
mod tests;
