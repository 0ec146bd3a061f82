// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module loads and saves private key documents as plain JSON files on the local filesystem.
//!
//! An example private key file looks like this:
//!
//! `````text
//! {"format":"t3pp-private-key","version":1,
//!  "publicKey":{"crv":"P-256","x":"...","y":"..."},
//!  "d":"..."}
//! `````
//!
//! The file is not encrypted. Operators are expected to keep it somewhere safe.

use super::{PrivateKey, PRIVATE_KEY_FORMAT};
use crate::package::error::{Error, PatchErrorKind};
use crate::package::{open_existing, Result};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Loads a private key document from the given path, checking its format tag and version.
///
/// A missing file is reported as [PatchErrorKind::NotFound], and a wrong tag or version as
/// [PatchErrorKind::InvalidFormat].
pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let file = open_existing(path)?;
    let reader = BufReader::new(file);
    let key: PrivateKey = serde_json::from_reader(reader)?;

    if !key.format.eq_ignore_ascii_case(PRIVATE_KEY_FORMAT) || key.version != 1 {
        return Err(Error::PatchError(PatchErrorKind::InvalidFormat));
    }

    Ok(key)
}

/// Saves a private key document to the given path, replacing any existing file.
pub fn save_private_key(path: &Path, key: &PrivateKey) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, key)?;
    writer.flush()?;
    Ok(())
}
