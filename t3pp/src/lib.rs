// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! The t3pp crate contains the functionality required to sign, read and verify `.t3pp` patch files
//! that carry an offline publisher signature.
//!
//! A signed patch is the original patch payload with a JSON envelope and a fixed 12-byte footer appended
//! to it. The envelope carries the publisher certificate, the signed manifest and the signature itself.
//! Files without the footer are legacy (unsigned) patches, which remain readable by the patch engine but
//! cannot be verified.

pub mod canonical;
pub mod cert;
pub mod digest;
pub mod keys;
pub mod package;
pub mod sign;
pub mod trust;
pub mod verify;

mod step;
