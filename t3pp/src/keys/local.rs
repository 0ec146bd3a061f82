// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module generates fresh publisher key pairs in local process memory.

use super::{EcdsaPublicKey, PrivateKey};
use crate::digest::sha256_hex;

use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;

/// Generates a fresh random P-256 key pair.
///
/// Returns the private key document, its public key and the public key fingerprint. The private key
/// document is only ever held in local memory until the caller chooses to save it with
/// [super::file::save_private_key].
pub fn generate_key_pair() -> (PrivateKey, EcdsaPublicKey, String) {
    let signing_key = SigningKey::random(&mut OsRng);
    let point = signing_key.verifying_key().to_encoded_point(false);
    let fingerprint = sha256_hex(point.as_bytes());

    let private_key = PrivateKey::from_signing_key(&signing_key);
    let public_key = private_key.public_key.clone();
    (private_key, public_key, fingerprint)
}
