// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module provides the error definitions for errors that can occur within the signing, reading and
//! verification of signed patch files.

use thiserror::Error;

/// Errors that can occur when processing signed patch files.
#[derive(Error, Debug)]
pub enum Error {
    /// An error that has been re-badged from the `std::io` subsystem, such as a file being deleted or
    /// truncated while it is being processed. These are never retried.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Error coming from the serde_json crate.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Errors relating to the publisher key material.
    #[error(transparent)]
    KeyError(#[from] crate::keys::error::KeyError),

    /// This kind of error represents a violated precondition or a malformed signed patch.
    #[error(transparent)]
    PatchError(#[from] PatchErrorKind),
}

impl Error {
    /// Returns the patch error kind, if this error is one.
    pub fn kind(&self) -> Option<PatchErrorKind> {
        match self {
            Error::PatchError(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// These error variants are raised directly by code in this crate, as opposed to errors that are
/// simply being re-badged from underlying subsystems such as I/O.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchErrorKind {
    #[error("The input file could not be found.")]
    NotFound,

    #[error("The patch already contains a signature block.")]
    AlreadySigned,

    #[error("The private key does not match the publisher certificate public key.")]
    KeyCertificateMismatch,

    #[error("The signature block is too large.")]
    SignatureBlockTooLarge,

    #[error("The signature footer is present but describes an impossible block geometry.")]
    CorruptFooter,

    #[error("The signature envelope is malformed or has an unsupported format or version.")]
    InvalidEnvelope,

    #[error("Unsupported signature algorithm.")]
    UnsupportedAlgorithm,

    #[error("The signature is not valid base64.")]
    InvalidSignatureEncoding,

    #[error("Signature verification failed.")]
    SignatureInvalid,

    #[error("The patch payload hash does not match the manifest.")]
    PayloadHashMismatch,

    #[error("The target state could not be checked.")]
    TargetCheckError,

    #[error("The document does not carry the expected format tag or version.")]
    InvalidFormat,

    #[error("The manifest is not well formed.")]
    InvalidManifest,

    #[error("The output path must be different from the input patch path.")]
    SameInputOutput,
}
