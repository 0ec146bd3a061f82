// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module provides the error definitions for errors that can occur while decoding, generating
//! or storing publisher key material.

use thiserror::Error;

/// Specific error types for errors that can occur within key handling.
#[derive(Error, Debug)]
pub enum KeyError {
    /// A key coordinate or scalar was not valid base64url.
    #[error(transparent)]
    Base64DecodeError(#[from] base64::DecodeError),

    /// The key bytes do not describe a valid P-256 point or scalar.
    #[error(transparent)]
    EcdsaError(#[from] p256::ecdsa::Error),

    /// The key names a curve other than P-256.
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// A public key coordinate did not decode to exactly 32 bytes.
    #[error("Public key coordinates must be 32 bytes each.")]
    InvalidCoordinateLength,

    /// The private scalar did not decode to exactly 32 bytes.
    #[error("Private key scalar must be 32 bytes.")]
    InvalidScalarLength,

    /// The public key stored next to a private scalar is not the one derived from it.
    #[error("The stored public key does not belong to the private key.")]
    PublicKeyMismatch,
}
