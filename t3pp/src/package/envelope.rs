// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements the envelope, the JSON block appended to a patch payload.

use super::error::{Error, PatchErrorKind};
use super::footer::{read_footer, FooterGeometry};
use super::manifest::Manifest;
use super::{open_existing, Result, ENVELOPE_FORMAT, MAX_SIGNATURE_BLOCK_BYTES};
use crate::canonical::canonicalize;
use crate::cert::PublisherCertificate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Version 1 of the envelope document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Always [ENVELOPE_FORMAT].
    pub format: String,

    /// Always 1.
    pub version: u32,

    pub publisher: PublisherCertificate,

    pub manifest: Manifest,

    #[serde(rename = "alg")]
    pub algorithm: String,

    /// The signature over the canonical manifest bytes, in standard base64.
    #[serde(rename = "sig")]
    pub signature: String,
}

impl Envelope {
    pub fn new(
        publisher: PublisherCertificate,
        manifest: Manifest,
        algorithm: &str,
        signature: String,
    ) -> Envelope {
        Envelope {
            format: ENVELOPE_FORMAT.to_string(),
            version: 1,
            publisher,
            manifest,
            algorithm: algorithm.to_string(),
            signature,
        }
    }

    /// Parses an envelope block. Any parse failure, and any format tag or version other than the
    /// expected one, is reported as [PatchErrorKind::InvalidEnvelope].
    pub fn from_bytes(block: &[u8]) -> Result<Envelope> {
        Envelope::from_block(block).map(|(envelope, _)| envelope)
    }

    /// Parses an envelope block, also returning the canonical bytes of the manifest exactly as it was
    /// carried in the block. Those bytes are what the signature covers, so they are taken from the
    /// parsed JSON tree and never from the typed [Manifest].
    pub fn from_block(block: &[u8]) -> Result<(Envelope, Vec<u8>)> {
        let invalid = |_e| Error::PatchError(PatchErrorKind::InvalidEnvelope);

        let tree: Value = serde_json::from_slice(block).map_err(invalid)?;
        let manifest_bytes = match tree.get("manifest") {
            Some(manifest) => canonicalize(manifest).map_err(invalid)?,
            None => return Err(Error::PatchError(PatchErrorKind::InvalidEnvelope)),
        };
        let envelope: Envelope = serde_json::from_value(tree).map_err(invalid)?;
        if !envelope.format.eq_ignore_ascii_case(ENVELOPE_FORMAT) || envelope.version != 1 {
            return Err(Error::PatchError(PatchErrorKind::InvalidEnvelope));
        }
        Ok((envelope, manifest_bytes))
    }

    /// Serializes the envelope as compact JSON, enforcing the block size cap.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let block = serde_json::to_vec(self)?;
        if block.len() as u64 > MAX_SIGNATURE_BLOCK_BYTES {
            return Err(Error::PatchError(PatchErrorKind::SignatureBlockTooLarge));
        }
        Ok(block)
    }
}

fn read_block<R: Read + Seek>(source: &mut R, geometry: &FooterGeometry) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(geometry.payload_length))?;
    let mut block = vec![0_u8; geometry.block_length as usize];
    source.read_exact(&mut block)?;
    Ok(block)
}

/// Reads and parses the envelope block located by `geometry`.
pub fn read_envelope<R: Read + Seek>(source: &mut R, geometry: &FooterGeometry) -> Result<Envelope> {
    Envelope::from_bytes(&read_block(source, geometry)?)
}

/// The signature-related parts of a signed patch file, read but not verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPatch {
    pub geometry: FooterGeometry,
    pub envelope: Envelope,

    /// Canonical bytes of the manifest as carried on the wire. The signature is checked against these.
    pub manifest_bytes: Vec<u8>,
}

/// Reads the footer and envelope of the given stream. Returns `Ok(None)` for an unsigned patch.
pub fn read_signed_stream<R: Read + Seek>(source: &mut R) -> Result<Option<SignedPatch>> {
    match read_footer(source)? {
        Some(geometry) => {
            let (envelope, manifest_bytes) = Envelope::from_block(&read_block(source, &geometry)?)?;
            Ok(Some(SignedPatch {
                geometry,
                envelope,
                manifest_bytes,
            }))
        }
        None => Ok(None),
    }
}

/// Reads the footer and envelope of the patch at the given path without verifying anything.
///
/// This is suitable for showing patch details before verification. Nothing returned here may be relied
/// upon until the patch has been verified.
pub fn read_signed_patch(path: &Path) -> Result<Option<SignedPatch>> {
    let mut file = open_existing(path)?;
    read_signed_stream(&mut file)
}

/// Reads the envelope of the patch at the given path. An unsigned patch yields `Ok(None)`.
pub fn try_read_envelope(path: &Path) -> Result<Option<Envelope>> {
    Ok(read_signed_patch(path)?.map(|signed| signed.envelope))
}
