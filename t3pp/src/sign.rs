// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements patch signing.
//!
//! Signing never modifies the input payload. The signed output is the payload copied verbatim, followed
//! by the envelope block and the footer. The footer is always written last, so a partially written output
//! can never be mistaken for a signed patch.

use crate::canonical::canonicalize_serializable;
use crate::cert::PublisherCertificate;
use crate::digest::sha256_reader;
use crate::keys::PrivateKey;
use crate::package::envelope::Envelope;
use crate::package::error::{Error, PatchErrorKind};
use crate::package::footer::{read_footer, Footer};
use crate::package::manifest::{Manifest, ManifestTemplate};
use crate::package::{open_existing, Result, SIGNATURE_ALGORITHM};
use crate::step::LogStep;
use chrono::Utc;
use log::{debug, info, warn};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::Signature;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Signs the payload at `payload_path` and returns the complete signed patch in memory.
pub fn sign_patch(
    payload_path: &Path,
    certificate: &PublisherCertificate,
    private_key: &PrivateKey,
    template: &ManifestTemplate,
) -> Result<Vec<u8>> {
    let mut signed = Vec::new();
    sign_to_writer(payload_path, certificate, private_key, template, &mut signed)?;
    Ok(signed)
}

/// Signs the payload at `payload_path`, streaming the signed patch into `writer`.
///
/// Returns the envelope that was appended. Nothing is written to `writer` until every precondition has
/// been checked and the signature has been computed.
pub fn sign_to_writer<W: Write>(
    payload_path: &Path,
    certificate: &PublisherCertificate,
    private_key: &PrivateKey,
    template: &ManifestTemplate,
    writer: &mut W,
) -> Result<Envelope> {
    let _step = LogStep::begin("Sign patch");

    let mut payload = open_existing(payload_path)?;
    if read_footer(&mut payload)?.is_some() {
        return Err(Error::PatchError(PatchErrorKind::AlreadySigned));
    }

    let fingerprint = certificate.fingerprint()?;
    if fingerprint != private_key.fingerprint()? {
        return Err(Error::PatchError(PatchErrorKind::KeyCertificateMismatch));
    }
    let signing_key = private_key.to_signing_key()?;

    let payload_length = payload.metadata()?.len();
    payload.seek(SeekFrom::Start(0))?;
    let payload_sha256 = sha256_reader(&mut payload, payload_length)?;
    info!("Patch payload SHA-256: {} ({} bytes)", payload_sha256, payload_length);

    let manifest = Manifest::from_template(template, payload_sha256, Utc::now());
    manifest.validate()?;

    let canonical = canonicalize_serializable(&manifest)?;
    let signature: Signature = signing_key.sign(&canonical);
    let signature = base64::encode(signature.to_bytes());

    let envelope = Envelope::new(certificate.clone(), manifest, SIGNATURE_ALGORITHM, signature);
    let block = envelope.to_bytes()?;
    let footer = Footer::for_block(block.len())?;
    info!("Publisher fingerprint: {}", fingerprint);
    info!("Signature block: {} bytes", block.len());

    payload.seek(SeekFrom::Start(0))?;
    let copied = io::copy(&mut (&mut payload).take(payload_length), writer)?;
    if copied != payload_length {
        // The payload shrank underneath us.
        return Err(Error::IoError(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "patch payload changed while signing",
        )));
    }
    writer.write_all(&block)?;
    footer.write_to_stream(writer)?;
    writer.flush()?;

    Ok(envelope)
}

/// Signs the payload at `input_path` and writes the signed patch to `output_path`.
///
/// The output is first written to a sibling `.partial` file which is renamed into place once complete.
/// The output path must differ from the input path.
pub fn sign_patch_file(
    input_path: &Path,
    output_path: &Path,
    certificate: &PublisherCertificate,
    private_key: &PrivateKey,
    template: &ManifestTemplate,
) -> Result<Envelope> {
    if is_same_file(input_path, output_path) {
        return Err(Error::PatchError(PatchErrorKind::SameInputOutput));
    }

    let partial_path = partial_path(output_path);
    debug!("Writing signed patch to {}", partial_path.display());

    let result = write_partial(
        input_path,
        &partial_path,
        certificate,
        private_key,
        template,
    )
    .and_then(|envelope| {
        fs::rename(&partial_path, output_path)?;
        Ok(envelope)
    });

    if result.is_err() && partial_path.exists() {
        if let Err(e) = fs::remove_file(&partial_path) {
            warn!("Could not remove {}: {}", partial_path.display(), e);
        }
    }
    result
}

fn write_partial(
    input_path: &Path,
    partial_path: &Path,
    certificate: &PublisherCertificate,
    private_key: &PrivateKey,
    template: &ManifestTemplate,
) -> Result<Envelope> {
    let file = File::create(partial_path)?;
    let mut writer = BufWriter::new(file);
    let envelope = sign_to_writer(input_path, certificate, private_key, template, &mut writer)?;
    let file = writer.into_inner().map_err(|e| Error::IoError(e.into_error()))?;
    file.sync_all()?;
    Ok(envelope)
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::local::generate_key_pair;
    use crate::package::envelope::read_signed_patch;
    use crate::package::footer::{FOOTER_LEN, MAGIC};
    use crate::package::manifest::{PatchMode, Target};

    fn publisher() -> (PrivateKey, PublisherCertificate) {
        let (private_key, public_key, _) = generate_key_pair();
        let cert = PublisherCertificate::new("Tools", "Dist", "7", public_key);
        (private_key, cert)
    }

    fn template() -> ManifestTemplate {
        ManifestTemplate::for_target(Target::file(&"A".repeat(64), Some(10))).with_notes("notes")
    }

    #[test]
    fn test_sign_layout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        fs::write(&input, b"abc").unwrap();
        let (key, cert) = publisher();

        let signed = sign_patch(&input, &cert, &key, &template()).unwrap();
        assert_eq!(&signed[..3], b"abc");
        assert_eq!(&signed[signed.len() - 8..], &MAGIC);

        let mut len_bytes = [0_u8; 4];
        len_bytes.copy_from_slice(&signed[signed.len() - 12..signed.len() - 8]);
        let block_len = i32::from_le_bytes(len_bytes) as usize;
        assert_eq!(signed.len(), 3 + block_len + FOOTER_LEN as usize);

        let envelope = Envelope::from_bytes(&signed[3..3 + block_len]).unwrap();
        assert_eq!(
            envelope.manifest.patch_payload_sha256,
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
        assert_eq!(envelope.manifest.notes.as_deref(), Some("notes"));
        assert_eq!(envelope.algorithm, SIGNATURE_ALGORITHM);
        assert_eq!(base64::decode(&envelope.signature).unwrap().len(), 64);
        assert_eq!(envelope.publisher, cert);

        // The input is untouched.
        assert_eq!(fs::read(&input).unwrap(), b"abc");
    }

    #[test]
    fn test_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.t3pp");
        fs::write(&input, b"").unwrap();
        let (key, cert) = publisher();
        let signed = sign_patch(&input, &cert, &key, &template()).unwrap();
        let output = dir.path().join("empty.signed.t3pp");
        fs::write(&output, signed).unwrap();
        let read = read_signed_patch(&output).unwrap().unwrap();
        assert_eq!(read.geometry.payload_length, 0);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let (key, cert) = publisher();
        let err = sign_patch(&dir.path().join("nope"), &cert, &key, &template()).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::NotFound));
    }

    #[test]
    fn test_refuses_double_sign() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        let signed_path = dir.path().join("patch.signed.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, cert) = publisher();

        sign_patch_file(&input, &signed_path, &cert, &key, &template()).unwrap();
        let err = sign_patch(&signed_path, &cert, &key, &template()).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::AlreadySigned));
    }

    #[test]
    fn test_key_certificate_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, _) = publisher();
        let (_, other_cert) = publisher();

        let err = sign_patch(&input, &other_cert, &key, &template()).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::KeyCertificateMismatch));
    }

    #[test]
    fn test_invalid_manifest_template() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, cert) = publisher();

        let mut template = template();
        template.patch_mode = PatchMode::Directory;
        let err = sign_patch(&input, &cert, &key, &template).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::InvalidManifest));
    }

    #[test]
    fn test_oversized_notes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, cert) = publisher();

        let template = template().with_notes(&"n".repeat(3 * 1024 * 1024));
        let err = sign_patch(&input, &cert, &key, &template).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::SignatureBlockTooLarge));
    }

    #[test]
    fn test_same_input_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, cert) = publisher();

        let err = sign_patch_file(&input, &input, &cert, &key, &template()).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::SameInputOutput));
        let dotted = dir.path().join(".").join("patch.t3pp");
        let err = sign_patch_file(&input, &dotted, &cert, &key, &template()).unwrap_err();
        assert_eq!(err.kind(), Some(PatchErrorKind::SameInputOutput));
        assert_eq!(fs::read(&input).unwrap(), b"payload");
    }

    #[test]
    fn test_failed_sign_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        let output = dir.path().join("out.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, _) = publisher();
        let (_, other_cert) = publisher();

        assert!(sign_patch_file(&input, &output, &other_cert, &key, &template()).is_err());
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_sign_directory_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patch.t3pp");
        let output = dir.path().join("out.t3pp");
        fs::write(&input, b"payload").unwrap();
        let (key, cert) = publisher();

        let target = Target::directory(Vec::new(), vec!["new/file.bin".to_string()]);
        let envelope = sign_patch_file(
            &input,
            &output,
            &cert,
            &key,
            &ManifestTemplate::for_target(target),
        )
        .unwrap();
        assert_eq!(envelope.manifest.patch_mode, PatchMode::Directory);
        assert_eq!(read_signed_patch(&output).unwrap().unwrap().envelope, envelope);
    }
}
