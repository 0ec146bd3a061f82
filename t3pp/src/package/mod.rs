// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements the signed patch file format.
//!
//! A signed patch is laid out as follows:
//!
//! `````text
//! [raw patch payload bytes][envelope JSON bytes][envelope length: u32 LE][magic: "T3PPSIG1"]
//! `````
//!
//! The payload is never inspected by this crate. The envelope is a compact JSON document carrying the
//! publisher certificate, the signed [manifest::Manifest] and the signature over the manifest. The
//! trailing 12-byte [footer] locates the envelope, and its presence is the only signal that a file
//! carries a signature at all.

pub mod envelope;
pub mod error;
pub mod footer;
pub mod manifest;
pub mod target;

use error::{Error, PatchErrorKind};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Convenient result alias for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Format tag of the envelope document.
pub const ENVELOPE_FORMAT: &str = "t3pp-signed-patch";

/// Format tag of the manifest document.
pub const MANIFEST_FORMAT: &str = "t3pp-patch-manifest";

/// Format tag of the publisher certificate document.
pub const PUBLISHER_CERTIFICATE_FORMAT: &str = "t3pp-publisher-cert";

/// The only supported signature algorithm: ECDSA over P-256 with SHA-256, fixed-size `r || s` encoding.
pub const SIGNATURE_ALGORITHM: &str = "ECDSA-P256-SHA256";

/// Upper bound on the size of the envelope JSON block.
pub const MAX_SIGNATURE_BLOCK_BYTES: u64 = 2 * 1024 * 1024;

/// Opens an existing file for reading, reporting a missing file as [PatchErrorKind::NotFound].
pub(crate) fn open_existing(path: &Path) -> Result<File> {
    match File::open(path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(Error::PatchError(PatchErrorKind::NotFound))
        }
        Err(e) => Err(Error::IoError(e)),
    }
}
