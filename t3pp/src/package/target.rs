// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Builds a [Target] from the current state of a file or directory on disk.
//!
//! Publishers sign a patch against a known-good target. This module captures that target so that it
//! can be recorded in the manifest.

use super::error::{Error, PatchErrorKind};
use super::manifest::{normalize_relative_path, PatchMode, Target, TargetDirectoryFile};
use super::Result;
use crate::digest::sha256_file;
use log::debug;
use std::path::Path;
use walkdir::WalkDir;

/// Describes the file or directory at `path` as a target of the given mode.
///
/// In directory mode every regular file below `path` is listed, sorted by its forward-slash relative
/// path. Symbolic links are not followed.
pub fn describe_target(path: &Path, mode: PatchMode) -> Result<Target> {
    match mode {
        PatchMode::File => {
            if !path.is_file() {
                return Err(Error::PatchError(PatchErrorKind::NotFound));
            }
            let (sha256, size) = sha256_file(path)?;
            Ok(Target::file(&sha256, Some(size)))
        }
        PatchMode::Directory => {
            if !path.is_dir() {
                return Err(Error::PatchError(PatchErrorKind::NotFound));
            }
            Ok(Target::directory(describe_directory(path)?, Vec::new()))
        }
    }
}

/// Like [describe_target] in directory mode, additionally declaring files the patch will create.
pub fn describe_directory_target(path: &Path, new_files: &[String]) -> Result<Target> {
    let mut target = describe_target(path, PatchMode::Directory)?;
    let mut new_files: Vec<String> = new_files
        .iter()
        .map(|p| normalize_relative_path(p))
        .collect();
    new_files.sort();
    new_files.dedup();
    if !new_files.is_empty() {
        target.new_files = Some(new_files);
    }
    target.validate()?;
    Ok(target)
}

fn describe_directory(root: &Path) -> Result<Vec<TargetDirectoryFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_e| Error::PatchError(PatchErrorKind::InvalidManifest))?;
        let relative = normalize_relative_path(&relative.to_string_lossy());
        let (sha256, size) = sha256_file(entry.path())?;
        debug!("{} {} ({} bytes)", sha256, relative, size);

        files.push(TargetDirectoryFile {
            path: relative,
            sha256,
            size: Some(size),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
