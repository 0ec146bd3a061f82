// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements the fixed 12-byte footer that terminates every signed patch file.
//!
//! The footer is a 4-byte little-endian signed length of the envelope JSON block that immediately
//! precedes it, followed by the 8-byte ASCII magic `T3PPSIG1`. Files whose last 8 bytes are not the
//! magic are legacy (unsigned) patches, which is not an error. A file whose magic is present but whose
//! declared geometry is impossible claims to be signed and is rejected with
//! [PatchErrorKind::CorruptFooter].

use super::error::{Error, PatchErrorKind};
use super::{open_existing, Result, MAX_SIGNATURE_BLOCK_BYTES};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// The footer magic. All signed patch files end with these 8 bytes.
pub const MAGIC: [u8; 8] = *b"T3PPSIG1";

/// Total size of the footer in bytes.
pub const FOOTER_LEN: u64 = 12;

/// The raw footer, exactly as it appears at the end of the file.
///
/// This structure can be serialized and deserialized using [bincode](https://crates.io/crates/bincode),
/// whose default fixed-width little-endian integer encoding matches the on-disk layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Footer {
    /// Length of the envelope JSON block, in bytes.
    pub block_length: i32,

    /// Must equal [MAGIC].
    pub magic: [u8; 8],
}

/// Where the payload and envelope live inside a signed file, as derived from a valid footer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FooterGeometry {
    /// Length of the envelope JSON block.
    pub block_length: u64,

    /// Length of the patch payload, which is also the offset of the envelope block.
    pub payload_length: u64,

    /// Total length of the file.
    pub total_length: u64,
}

impl Footer {
    /// Creates a footer for an envelope block of the given size, enforcing the safety cap.
    pub fn for_block(block_length: usize) -> Result<Footer> {
        if block_length == 0 || block_length as u64 > MAX_SIGNATURE_BLOCK_BYTES {
            return Err(Error::PatchError(PatchErrorKind::SignatureBlockTooLarge));
        }
        let block_length = i32::try_from(block_length)
            .map_err(|_e| Error::PatchError(PatchErrorKind::SignatureBlockTooLarge))?;
        Ok(Footer {
            block_length,
            magic: MAGIC,
        })
    }

    /// Writes the 12 footer bytes to the given stream.
    pub fn write_to_stream<W: Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_all(&self.block_length.to_le_bytes())?;
        stream.write_all(&self.magic)?;
        Ok(())
    }

    fn has_magic(&self) -> bool {
        self.magic == MAGIC
    }
}

/// Reads the footer from the end of the given stream.
///
/// Returns `Ok(None)` if the stream is shorter than the footer, or if the magic does not match. The seek
/// position of the stream is left unspecified.
pub fn read_footer<R: Read + Seek>(source: &mut R) -> Result<Option<FooterGeometry>> {
    let total_length = source.seek(SeekFrom::End(0))?;
    if total_length < FOOTER_LEN {
        return Ok(None);
    }

    let mut footer_bytes = [0_u8; FOOTER_LEN as usize];
    source.seek(SeekFrom::Start(total_length - FOOTER_LEN))?;
    source.read_exact(&mut footer_bytes)?;

    let footer: Footer = bincode::deserialize(&footer_bytes)
        .map_err(|_e| Error::PatchError(PatchErrorKind::CorruptFooter))?;

    if !footer.has_magic() {
        return Ok(None);
    }

    if footer.block_length <= 0 || footer.block_length as u64 > MAX_SIGNATURE_BLOCK_BYTES {
        return Err(Error::PatchError(PatchErrorKind::CorruptFooter));
    }

    let block_length = footer.block_length as u64;
    let payload_length = (total_length - FOOTER_LEN)
        .checked_sub(block_length)
        .ok_or(Error::PatchError(PatchErrorKind::CorruptFooter))?;

    Ok(Some(FooterGeometry {
        block_length,
        payload_length,
        total_length,
    }))
}

/// Opens the file at the given path and reads its footer. See [read_footer].
pub fn try_read_footer(path: &Path) -> Result<Option<FooterGeometry>> {
    let mut file = open_existing(path)?;
    read_footer(&mut file)
}
