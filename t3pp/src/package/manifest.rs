// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements the patch manifest, which is the document that actually gets signed.
//!
//! The manifest never embeds the patch payload. It records the SHA-256 of the payload bytes, when the
//! patch was signed, and a description of the target the patch is meant for, so that a consumer can
//! detect a correctly signed patch being applied to the wrong file or directory.

use super::error::{Error, PatchErrorKind};
use super::{Result, MANIFEST_FORMAT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Whether a patch applies to a single file or to a directory tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchMode {
    Directory,
    File,
}

/// Expected content of the single target file in [PatchMode::File].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFile {
    /// SHA-256 of the file, in hex.
    pub sha256: String,

    /// Size of the file in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Expected content of one file inside the target directory in [PatchMode::Directory].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDirectoryFile {
    /// Path relative to the target directory, using forward slashes.
    pub path: String,

    /// SHA-256 of the file, in hex.
    pub sha256: String,

    /// Size of the file in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Description of the target state a patch was signed for.
///
/// On the wire this is a flat object with a `type` tag and nullable per-variant fields. Only the fields
/// belonging to the declared type may be populated; see [Target::validate].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: PatchMode,

    /// File mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<TargetFile>,

    /// Directory mode only: files expected to exist with the given content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<TargetDirectoryFile>>,

    /// Directory mode only: files the patch creates, which must not exist yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_files: Option<Vec<String>>,
}

impl Target {
    /// A target with the given type tag and no expected state.
    ///
    /// Signing with an empty target is allowed, but the target check will always report an error for it.
    pub fn empty(kind: PatchMode) -> Target {
        Target {
            kind,
            file: None,
            files: None,
            new_files: None,
        }
    }

    /// A single-file target.
    pub fn file(sha256: &str, size: Option<u64>) -> Target {
        Target {
            file: Some(TargetFile {
                sha256: sha256.to_string(),
                size,
            }),
            ..Target::empty(PatchMode::File)
        }
    }

    /// A directory target. Empty lists are stored as absent.
    pub fn directory(files: Vec<TargetDirectoryFile>, new_files: Vec<String>) -> Target {
        Target {
            files: if files.is_empty() { None } else { Some(files) },
            new_files: if new_files.is_empty() {
                None
            } else {
                Some(new_files)
            },
            ..Target::empty(PatchMode::Directory)
        }
    }

    /// Checks that only the declared variant is populated, that every hash is a SHA-256 hex digest, and
    /// that every relative path is normalized, safe and unique.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            PatchMode::File => {
                if self.files.is_some() || self.new_files.is_some() {
                    return Err(invalid_manifest());
                }
                if let Some(file) = &self.file {
                    check_sha256_hex(&file.sha256)?;
                }
            }
            PatchMode::Directory => {
                if self.file.is_some() {
                    return Err(invalid_manifest());
                }

                let mut seen = HashSet::new();
                for entry in self.files.iter().flatten() {
                    check_sha256_hex(&entry.sha256)?;
                    if !is_safe_relative_path(&entry.path) || !seen.insert(entry.path.as_str()) {
                        return Err(invalid_manifest());
                    }
                }

                // New files are a separate list, but a path cannot be both present and new.
                let mut seen_new = HashSet::new();
                for path in self.new_files.iter().flatten() {
                    if !is_safe_relative_path(path)
                        || seen.contains(path.as_str())
                        || !seen_new.insert(path.as_str())
                    {
                        return Err(invalid_manifest());
                    }
                }
            }
        }
        Ok(())
    }
}

/// The caller-supplied part of a manifest. The signer fills in the payload hash and, if unset, the
/// creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestTemplate {
    pub patch_mode: PatchMode,
    pub created_at_utc: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub target: Target,
}

impl ManifestTemplate {
    /// A template for the given target, whose type also determines the patch mode.
    pub fn for_target(target: Target) -> ManifestTemplate {
        ManifestTemplate {
            patch_mode: target.kind,
            created_at_utc: None,
            notes: None,
            target,
        }
    }

    /// Attaches free-text notes. Blank notes are dropped.
    pub fn with_notes(mut self, notes: &str) -> ManifestTemplate {
        let trimmed = notes.trim();
        self.notes = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }
}

/// Version 1 of the manifest document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always [MANIFEST_FORMAT].
    pub format: String,

    /// Always 1.
    pub version: u32,

    /// Must equal the type of [Manifest::target].
    pub patch_mode: PatchMode,

    /// SHA-256 of the patch payload (everything before the envelope block), in hex.
    #[serde(rename = "patchPayloadSha256")]
    pub patch_payload_sha256: String,

    pub created_at_utc: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub target: Target,
}

impl Manifest {
    /// Completes a template with the payload hash, defaulting the creation time to `now`.
    pub fn from_template(
        template: &ManifestTemplate,
        patch_payload_sha256: String,
        now: DateTime<Utc>,
    ) -> Manifest {
        Manifest {
            format: MANIFEST_FORMAT.to_string(),
            version: 1,
            patch_mode: template.patch_mode,
            patch_payload_sha256,
            created_at_utc: template.created_at_utc.unwrap_or(now),
            notes: template.notes.clone(),
            target: template.target.clone(),
        }
    }

    /// Checks the format tag, version, mode consistency and the target invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.format.eq_ignore_ascii_case(MANIFEST_FORMAT) || self.version != 1 {
            return Err(Error::PatchError(PatchErrorKind::InvalidFormat));
        }
        if self.patch_mode != self.target.kind {
            return Err(invalid_manifest());
        }
        check_sha256_hex(&self.patch_payload_sha256)?;
        self.target.validate()
    }
}

/// Converts a native relative path string to the forward-slash form used in manifests.
pub fn normalize_relative_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// True if the path is relative, uses forward slashes, and has no empty, `.` or `..` segments.
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.contains('\\') || path.contains(':') || path.starts_with('/') {
        return false;
    }
    path.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

fn check_sha256_hex(value: &str) -> Result<()> {
    if value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(invalid_manifest())
    }
}

fn invalid_manifest() -> Error {
    Error::PatchError(PatchErrorKind::InvalidManifest)
}
