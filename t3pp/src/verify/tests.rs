// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

use super::*;
use crate::keys::local::generate_key_pair;
use crate::keys::PrivateKey;
use crate::package::envelope::Envelope;
use crate::package::footer::{Footer, MAGIC};
use crate::package::manifest::{ManifestTemplate, Target, TargetDirectoryFile};
use crate::sign::sign_patch_file;
use crate::trust::file::FileTrustStore;
use crate::canonical::canonicalize;
use crate::digest::sha256_hex;
use chrono::Duration;
use p256::ecdsa::signature::Signer;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ABC_SHA256: &str = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";

struct Fixture {
    dir: TempDir,
    key: PrivateKey,
    cert: PublisherCertificate,
    trust: FileTrustStore,
}

impl Fixture {
    fn new() -> Fixture {
        let (key, public_key, fingerprint) = generate_key_pair();
        let cert = PublisherCertificate::new("Tools", "Dist", "1", public_key);
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            key,
            cert,
            trust: FileTrustStore::from_fingerprints(&[fingerprint]),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn sign(&self, payload: &[u8], target: Target) -> PathBuf {
        self.sign_with(payload, target, &self.cert)
    }

    fn sign_with(&self, payload: &[u8], target: Target, cert: &PublisherCertificate) -> PathBuf {
        let input = self.path("payload.bin");
        let output = self.path("signed.t3pp");
        fs::write(&input, payload).unwrap();
        sign_patch_file(&input, &output, cert, &self.key, &ManifestTemplate::for_target(target))
            .unwrap();
        output
    }

    fn verify(&self, patch: &Path, target: Option<&Path>) -> VerificationReport {
        Verifier::new(&self.trust).verify(patch, target)
    }
}

fn file_target() -> Target {
    Target::file(ABC_SHA256, Some(3))
}

/// Replaces the envelope block of a signed patch with the given bytes.
fn replace_block(path: &Path, block: &[u8]) {
    let signed = read_signed_patch(path).unwrap().unwrap();
    let bytes = fs::read(path).unwrap();
    let mut out = bytes[..signed.geometry.payload_length as usize].to_vec();
    out.extend_from_slice(block);
    Footer::for_block(block.len())
        .unwrap()
        .write_to_stream(&mut out)
        .unwrap();
    fs::write(path, out).unwrap();
}

fn edit_envelope<F: FnOnce(&mut Envelope)>(path: &Path, edit: F) {
    let mut envelope = read_signed_patch(path).unwrap().unwrap().envelope;
    edit(&mut envelope);
    replace_block(path, &serde_json::to_vec(&envelope).unwrap());
}

/// Serializes a JSON value with every object's keys in reverse order.
fn reversed_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let members: Vec<String> = map
                .iter()
                .rev()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), reversed_json(v)))
                .collect();
            format!("{{{}}}", members.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(reversed_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

#[test]
fn test_round_trip_verified() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Verified);
    assert!(report.is_verified());
    assert!(report.has_signature_block);
    assert!(report.signature_valid);
    assert!(report.payload_hash_valid);
    assert!(report.publisher_trusted);
    assert_eq!(report.certificate_validity, CertificateValidity::Valid);
    assert_eq!(report.failure_reason, None);
    assert_eq!(report.publisher.as_ref(), Some(&fixture.cert));
    assert_eq!(report.publisher_fingerprint, Some(fixture.cert.fingerprint().unwrap()));
    assert_eq!(report.target_check, TargetCheck::NotChecked);
}

#[test]
fn test_manifest_verified_as_carried() {
    // Offset timestamp with seven fractional digits and a member this crate does not model. Both are
    // covered by the signature exactly as written.
    let fixture = Fixture::new();
    let payload = b"payload bytes";
    let manifest = json!({
        "format": "t3pp-patch-manifest",
        "version": 1,
        "patchMode": "File",
        "patchPayloadSha256": sha256_hex(payload),
        "createdAtUtc": "2024-05-01T12:34:56.1234567+00:00",
        "tool": { "name": "PatchGUI", "build": 7 },
        "target": { "type": "File", "file": { "sha256": ABC_SHA256, "size": 3 } }
    });
    let signing_key = fixture.key.to_signing_key().unwrap();
    let signature: Signature = signing_key.sign(&canonicalize(&manifest).unwrap());
    let envelope = json!({
        "format": "t3pp-signed-patch",
        "version": 1,
        "publisher": serde_json::to_value(&fixture.cert).unwrap(),
        "manifest": manifest,
        "alg": "ECDSA-P256-SHA256",
        "sig": base64::encode(signature.to_bytes())
    });
    let block = serde_json::to_vec(&envelope).unwrap();

    let patch = fixture.path("carried.t3pp");
    let mut bytes = payload.to_vec();
    bytes.extend_from_slice(&block);
    Footer::for_block(block.len())
        .unwrap()
        .write_to_stream(&mut bytes)
        .unwrap();
    fs::write(&patch, bytes).unwrap();

    let report = fixture.verify(&patch, None);
    assert_eq!(report.failure_reason, None);
    assert_eq!(report.state, VerificationState::Verified);
    assert!(report.signature_valid);
    assert!(report.payload_hash_valid);
}

#[test]
fn test_untrusted_publisher() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    let nobody = FileTrustStore::default();

    let report = Verifier::new(&nobody).verify(&patch, None);
    assert_eq!(report.state, VerificationState::Untrusted);
    assert!(report.signature_valid);
    assert!(report.payload_hash_valid);
    assert!(!report.publisher_trusted);
}

#[test]
fn test_payload_tamper() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());

    let mut bytes = fs::read(&patch).unwrap();
    bytes[3] ^= 0x01;
    fs::write(&patch, bytes).unwrap();

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert!(report.signature_valid);
    assert!(!report.payload_hash_valid);
    assert_eq!(report.failure, Some(PatchErrorKind::PayloadHashMismatch));
    assert_eq!(report.failure_reason.as_deref(), Some("Patch payload hash mismatch."));
}

#[test]
fn test_signature_tamper() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());

    edit_envelope(&patch, |envelope| {
        let mut signature = base64::decode(&envelope.signature).unwrap();
        signature[10] ^= 0x01;
        envelope.signature = base64::encode(&signature);
    });

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert!(!report.signature_valid);
    assert_eq!(report.failure, Some(PatchErrorKind::SignatureInvalid));
    assert_eq!(report.failure_reason.as_deref(), Some("Signature verification failed."));
}

#[test]
fn test_manifest_tamper() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());

    edit_envelope(&patch, |envelope| {
        envelope.manifest.notes = Some("changed after signing".to_string());
    });

    let report = fixture.verify(&patch, None);
    assert_eq!(report.failure, Some(PatchErrorKind::SignatureInvalid));
}

#[test]
fn test_member_order_does_not_matter() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());

    let envelope = read_signed_patch(&patch).unwrap().unwrap().envelope;
    let reordered = reversed_json(&serde_json::to_value(&envelope).unwrap());
    assert_ne!(reordered.as_bytes(), serde_json::to_vec(&envelope).unwrap().as_slice());
    replace_block(&patch, reordered.as_bytes());

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Verified);
}

#[test]
fn test_expired_certificate() {
    let fixture = Fixture::new();
    let cert = fixture.cert.clone().valid_until(Utc::now() - Duration::days(1));
    let patch = fixture.sign_with(b"payload", file_target(), &cert);

    let report = fixture.verify(&patch, None);
    assert_eq!(report.certificate_validity, CertificateValidity::Expired);
    assert_eq!(report.state, VerificationState::Untrusted);
    assert!(report.signature_valid);
    assert!(report.publisher_trusted);
}

#[test]
fn test_evaluation_time_override() {
    let fixture = Fixture::new();
    let starts = Utc::now() + Duration::days(30);
    let cert = fixture.cert.clone().valid_from(starts);
    let patch = fixture.sign_with(b"payload", file_target(), &cert);

    let report = fixture.verify(&patch, None);
    assert_eq!(report.certificate_validity, CertificateValidity::NotYetValid);
    assert_eq!(report.state, VerificationState::Untrusted);

    let options = VerifyOptions {
        now: Some(starts + Duration::days(1)),
        ..VerifyOptions::default()
    };
    let report = Verifier::new(&fixture.trust)
        .with_options(options)
        .verify(&patch, None);
    assert_eq!(report.state, VerificationState::Verified);
}

#[test]
fn test_unsigned_file() {
    let fixture = Fixture::new();
    let legacy = fixture.path("legacy.t3pp");
    fs::write(&legacy, b"an old patch without any footer").unwrap();

    let report = fixture.verify(&legacy, Some(fixture.dir.path()));
    assert_eq!(report.state, VerificationState::Unsigned);
    assert!(!report.has_signature_block);
    assert!(!report.has_legacy_security_mark);
    assert_eq!(report.failure_reason, None);
    assert_eq!(report.target_check, TargetCheck::NotChecked);

    let tiny = fixture.path("tiny.t3pp");
    fs::write(&tiny, b"abc").unwrap();
    assert_eq!(fixture.verify(&tiny, None).state, VerificationState::Unsigned);
}

#[test]
fn test_legacy_marker() {
    let fixture = Fixture::new();
    let legacy = fixture.path("legacy.t3pp");
    fs::write(&legacy, b"HDR\0T3PP-SECURITY\0rest of an old patch").unwrap();

    let report = fixture.verify(&legacy, None);
    assert_eq!(report.state, VerificationState::Unsigned);
    assert!(report.has_legacy_security_mark);
    assert!(report.summary().starts_with("Legacy mark detected"));

    let options = VerifyOptions {
        probe_legacy_marker: false,
        ..VerifyOptions::default()
    };
    let report = Verifier::new(&fixture.trust)
        .with_options(options)
        .verify(&legacy, None);
    assert!(!report.has_legacy_security_mark);
}

#[test]
fn test_corrupt_footer() {
    let fixture = Fixture::new();
    let corrupt = fixture.path("corrupt.t3pp");
    let mut bytes = b"ab".to_vec();
    bytes.extend_from_slice(&100_i32.to_le_bytes());
    bytes.extend_from_slice(&MAGIC);
    fs::write(&corrupt, bytes).unwrap();

    let report = fixture.verify(&corrupt, None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert!(report.has_signature_block);
    assert_eq!(report.failure, Some(PatchErrorKind::CorruptFooter));
}

#[test]
fn test_invalid_envelope() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    replace_block(&patch, b"{\"format\":\"t3pp-signed-patch\"}");

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert!(report.has_signature_block);
    assert_eq!(report.failure, Some(PatchErrorKind::InvalidEnvelope));
    assert_eq!(report.manifest, None);
}

#[test]
fn test_invalid_public_key() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    edit_envelope(&patch, |envelope| envelope.publisher.public_key.x = "AAAA".to_string());

    let report = fixture.verify(&patch, None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert_eq!(report.failure_reason.as_deref(), Some("Invalid publisher public key."));
}

#[test]
fn test_unsupported_algorithm() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    edit_envelope(&patch, |envelope| envelope.algorithm = "RSA-PSS-SHA256".to_string());

    let report = fixture.verify(&patch, None);
    assert_eq!(report.failure, Some(PatchErrorKind::UnsupportedAlgorithm));
    assert_eq!(
        report.failure_reason.as_deref(),
        Some("Unsupported signature algorithm: RSA-PSS-SHA256")
    );
    assert!(report.publisher_trusted);
    assert!(report.manifest.is_some());
}

#[test]
fn test_signature_not_base64() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    edit_envelope(&patch, |envelope| envelope.signature = "***".to_string());

    let report = fixture.verify(&patch, None);
    assert_eq!(report.failure, Some(PatchErrorKind::InvalidSignatureEncoding));
    assert_eq!(report.failure_reason.as_deref(), Some("Signature is not valid base64."));
}

#[test]
fn test_missing_patch() {
    let fixture = Fixture::new();
    let report = fixture.verify(&fixture.path("none.t3pp"), None);
    assert_eq!(report.state, VerificationState::Invalid);
    assert_eq!(report.failure, Some(PatchErrorKind::NotFound));
}

#[test]
fn test_file_target_mismatch() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    let game = fixture.path("game.exe");
    fs::write(&game, b"abd").unwrap();

    let report = fixture.verify(&patch, Some(&game));
    assert_eq!(report.state, VerificationState::Verified);
    assert_eq!(report.target_check, TargetCheck::Mismatch);
    assert!(!report.target_issues.is_empty());

    fs::write(&game, b"abc").unwrap();
    let report = fixture.verify(&patch, Some(&game));
    assert_eq!(report.target_check, TargetCheck::Match);
    assert!(report.summary().ends_with("Target check: match."));
}

#[test]
fn test_directory_target_missing_file() {
    let fixture = Fixture::new();
    let target = Target::directory(
        vec![TargetDirectoryFile {
            path: "a/b.bin".to_string(),
            sha256: ABC_SHA256.to_string(),
            size: Some(3),
        }],
        Vec::new(),
    );
    let patch = fixture.sign(b"payload", target);
    let game_dir = fixture.path("game");
    fs::create_dir_all(&game_dir).unwrap();

    let report = fixture.verify(&patch, Some(&game_dir));
    assert_eq!(report.state, VerificationState::Verified);
    assert_eq!(report.target_check, TargetCheck::Mismatch);
    assert!(report.target_issues.contains(&"Missing: a/b.bin".to_string()));
}

#[test]
fn test_target_checked_on_invalid_report() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload bytes", file_target());
    let mut bytes = fs::read(&patch).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&patch, bytes).unwrap();
    let game = fixture.path("game.exe");
    fs::write(&game, b"abc").unwrap();

    let report = fixture.verify(&patch, Some(&game));
    assert_eq!(report.state, VerificationState::Invalid);
    assert_eq!(report.target_check, TargetCheck::Match);
}

#[test]
fn test_target_only_matches_full_verification() {
    let fixture = Fixture::new();
    let patch = fixture.sign(b"payload", file_target());
    let game = fixture.path("game.exe");
    fs::write(&game, b"xyz").unwrap();

    let verifier = Verifier::new(&fixture.trust);
    let base = verifier.verify_signature(&patch);
    let (check, issues) = verifier.verify_target_only(Some(&game), base.manifest.as_ref().unwrap());
    assert_eq!(base.with_target(check, issues), verifier.verify(&patch, Some(&game)));
}

#[test]
fn test_summary() {
    let mut report = VerificationReport::unsigned(false);
    assert_eq!(report.summary(), "No signature. Cannot verify origin or integrity offline.");
    assert_eq!(report.status_text(), "Unsigned");

    report = VerificationReport::empty(VerificationState::Untrusted);
    report.has_signature_block = true;
    let report = report.with_target(
        TargetCheck::Mismatch,
        vec!["Missing: a".into(), "Missing: b".into(), "Missing: c".into(), "Missing: d".into()],
    );
    assert_eq!(
        report.summary(),
        "Signed, but the publisher is not trusted (or the certificate is not valid).\n\
         Target check: mismatch (Missing: a, Missing: b, Missing: c, ...)."
    );

    let report = VerificationReport::invalid(Some(PatchErrorKind::SignatureInvalid), "Signature verification failed.");
    assert_eq!(
        report.summary(),
        "Signature/payload verification failed. The patch will be blocked.\nSignature verification failed."
    );
}
