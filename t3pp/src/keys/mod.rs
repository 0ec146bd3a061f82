// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module defines the publisher key material: ECDSA P-256 public keys as they are embedded in
//! certificates, the private key document held by the signing operator, and the fingerprint that
//! identifies a public key for trust decisions.
//!
//! Key coordinates and scalars are stored as unsigned big-endian byte strings, encoded as base64url
//! without padding. The fingerprint of a public key is the SHA-256 digest of its 65-byte uncompressed
//! point encoding (`0x04 || X || Y`), in uppercase hex. Certificates and private keys are fingerprinted
//! the same way, which is how the signer checks that a key belongs to a certificate.

pub mod error;
pub mod file;
pub mod local;

use crate::digest::sha256_hex;
use error::KeyError;
use p256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Convenient result alias for this module, where errors are of type [KeyError].
pub type Result<T> = std::result::Result<T, KeyError>;

/// The only supported curve identifier.
pub const CURVE_P256: &str = "P-256";

/// Format tag of a private key document.
pub const PRIVATE_KEY_FORMAT: &str = "t3pp-private-key";

const COORDINATE_LEN: usize = 32;

/// An ECDSA P-256 public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaPublicKey {
    /// The curve identifier, always "P-256".
    #[serde(rename = "crv")]
    pub curve: String,

    /// The X coordinate (base64url without padding).
    pub x: String,

    /// The Y coordinate (base64url without padding).
    pub y: String,
}

impl EcdsaPublicKey {
    /// Exports the coordinates of a verifying key.
    pub fn from_verifying_key(key: &VerifyingKey) -> EcdsaPublicKey {
        let point = key.to_encoded_point(false);
        // An uncompressed SEC1 point is always 0x04 || X || Y.
        let bytes = point.as_bytes();
        EcdsaPublicKey {
            curve: CURVE_P256.to_string(),
            x: base64url_encode(&bytes[1..1 + COORDINATE_LEN]),
            y: base64url_encode(&bytes[1 + COORDINATE_LEN..]),
        }
    }

    /// Returns the 65-byte uncompressed point encoding of this key.
    ///
    /// Only the shape of the encoding is checked here. Use [EcdsaPublicKey::to_verifying_key] to
    /// check that the point actually lies on the curve.
    pub fn uncompressed_point(&self) -> Result<Vec<u8>> {
        if !self.curve.eq_ignore_ascii_case(CURVE_P256) {
            return Err(KeyError::UnsupportedCurve(self.curve.clone()));
        }

        let x = base64url_decode(&self.x)?;
        let y = base64url_decode(&self.y)?;
        if x.len() != COORDINATE_LEN || y.len() != COORDINATE_LEN {
            return Err(KeyError::InvalidCoordinateLength);
        }

        let mut point = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
        point.push(0x04);
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);
        Ok(point)
    }

    /// Decodes this key into a verifying key, failing if the point is not on the curve.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        let point = self.uncompressed_point()?;
        Ok(VerifyingKey::from_sec1_bytes(&point)?)
    }

    /// Computes the fingerprint of this key.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(sha256_hex(&self.uncompressed_point()?))
    }
}

/// Computes the fingerprint of the given public key. See [EcdsaPublicKey::fingerprint].
pub fn fingerprint(public_key: &EcdsaPublicKey) -> Result<String> {
    public_key.fingerprint()
}

/// The private key document of a publisher. It never travels inside a signed patch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKey {
    /// Always [PRIVATE_KEY_FORMAT].
    pub format: String,

    /// Always 1.
    pub version: u32,

    /// The public half of the key pair.
    pub public_key: EcdsaPublicKey,

    /// The private scalar (base64url without padding).
    pub d: String,
}

impl PrivateKey {
    /// Wraps a signing key into a private key document.
    pub fn from_signing_key(key: &SigningKey) -> PrivateKey {
        PrivateKey {
            format: PRIVATE_KEY_FORMAT.to_string(),
            version: 1,
            public_key: EcdsaPublicKey::from_verifying_key(key.verifying_key()),
            d: base64url_encode(&key.to_bytes()),
        }
    }

    /// Decodes the private scalar into a signing key, and checks that the stored public key is the one
    /// derived from it.
    pub fn to_signing_key(&self) -> Result<SigningKey> {
        let d = base64url_decode(&self.d)?;
        if d.len() != COORDINATE_LEN {
            return Err(KeyError::InvalidScalarLength);
        }

        let key = SigningKey::from_slice(&d)?;
        let stored = self.public_key.to_verifying_key()?;
        if key.verifying_key() != &stored {
            return Err(KeyError::PublicKeyMismatch);
        }
        Ok(key)
    }

    /// The fingerprint of the public half of this key.
    pub fn fingerprint(&self) -> Result<String> {
        self.public_key.fingerprint()
    }
}

/// Encodes bytes as base64url without padding.
pub fn base64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes base64url text, with or without trailing padding.
pub fn base64url_decode(text: &str) -> Result<Vec<u8>> {
    Ok(base64::decode_config(
        text.trim().trim_end_matches('='),
        base64::URL_SAFE_NO_PAD,
    )?)
}

#[cfg(test)]
mod tests {
    use super::local::generate_key_pair;
    use super::*;

    #[test]
    fn test_fingerprint_matches_uncompressed_point_hash() {
        let (private_key, public_key, fp) = generate_key_pair();
        let point = public_key.uncompressed_point().unwrap();
        assert_eq!(point.len(), 65);
        assert_eq!(point[0], 0x04);
        assert_eq!(fp, sha256_hex(&point));
        assert_eq!(fp.len(), 64);
        assert_eq!(private_key.fingerprint().unwrap(), fp);
    }

    #[test]
    fn test_public_key_round_trips_through_verifying_key() {
        let (private_key, public_key, _) = generate_key_pair();
        let verifying = public_key.to_verifying_key().unwrap();
        assert_eq!(EcdsaPublicKey::from_verifying_key(&verifying), public_key);
        let signing = private_key.to_signing_key().unwrap();
        assert_eq!(signing.verifying_key(), &verifying);
    }

    #[test]
    fn test_unsupported_curve() {
        let (_, mut public_key, _) = generate_key_pair();
        public_key.curve = "P-384".to_string();
        match public_key.fingerprint().unwrap_err() {
            KeyError::UnsupportedCurve(c) => assert_eq!(c, "P-384"),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn test_short_coordinate_rejected() {
        let (_, mut public_key, _) = generate_key_pair();
        public_key.x = base64url_encode(&[1, 2, 3]);
        match public_key.fingerprint().unwrap_err() {
            KeyError::InvalidCoordinateLength => {}
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn test_point_not_on_curve_rejected() {
        let (_, mut public_key, _) = generate_key_pair();
        public_key.y = base64url_encode(&[0x11; 32]);
        assert!(public_key.fingerprint().is_ok());
        assert!(public_key.to_verifying_key().is_err());
    }

    #[test]
    fn test_mismatched_public_key_rejected() {
        let (mut private_key, _, _) = generate_key_pair();
        let (_, other_public, _) = generate_key_pair();
        private_key.public_key = other_public;
        match private_key.to_signing_key().unwrap_err() {
            KeyError::PublicKeyMismatch => {}
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn test_base64url_accepts_padding() {
        assert_eq!(base64url_decode("AQI").unwrap(), vec![1, 2]);
        assert_eq!(base64url_decode("AQI=").unwrap(), vec![1, 2]);
        assert!(base64url_decode("A").is_err());
    }
}
