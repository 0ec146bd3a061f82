// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! SHA-256 helpers. Files are always hashed in bounded chunks so that large patch payloads and target
//! files never need to be loaded into memory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Size of the read buffer used when stream-hashing files.
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Hashes an in-memory buffer and returns the digest as uppercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

/// Hashes at most `limit` bytes from the current position of the given reader.
///
/// Hashing stops early if the reader is exhausted before `limit` bytes have been consumed.
pub fn sha256_reader<R: Read>(reader: &mut R, limit: u64) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; HASH_CHUNK_SIZE];
    let mut remaining = limit;

    while remaining > 0 {
        let to_read = std::cmp::min(buffer.len() as u64, remaining) as usize;
        let read = match reader.read(&mut buffer[..to_read]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
        remaining -= read as u64;
    }

    Ok(hex::encode_upper(hasher.finalize()))
}

/// Hashes the first `length` bytes of the file at the given path.
pub fn sha256_file_prefix(path: &Path, length: u64) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    sha256_reader(&mut file, length)
}

/// Hashes the whole file at the given path, returning the hex digest and the file size.
pub fn sha256_file(path: &Path) -> std::io::Result<(String, u64)> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let hash = sha256_reader(&mut file, size)?;
    Ok((hash, size))
}

/// Compares two hex digests without regard to case.
pub fn hex_digest_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
