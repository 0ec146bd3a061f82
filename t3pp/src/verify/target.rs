// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Checks the current state of a target file or directory against the target recorded in a manifest.
//!
//! This check is independent of the signature. It catches a correctly signed patch being pointed at the
//! wrong target, such as a patch for one release of a game being applied to another.

use super::TargetCheck;
use crate::digest::{hex_digest_eq, sha256_reader};
use crate::package::manifest::{is_safe_relative_path, Manifest, PatchMode, Target};
use log::{error, warn};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Compares the target at `target_path` with the target described by `manifest`.
///
/// Returns [TargetCheck::NotChecked] with no issues if no target path is given. Any failure to read the
/// target is reported as [TargetCheck::Error], never as a match.
pub fn check_target(target_path: Option<&Path>, manifest: &Manifest) -> (TargetCheck, Vec<String>) {
    let target_path = match target_path {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => return (TargetCheck::NotChecked, Vec::new()),
    };

    let result = match manifest.target.kind {
        PatchMode::File => check_file(target_path, &manifest.target),
        PatchMode::Directory => check_directory(target_path, &manifest.target),
    };

    match result {
        Ok((TargetCheck::Mismatch, issues)) => {
            warn!("Target {} does not match the patch manifest", target_path.display());
            for issue in &issues {
                warn!("  {}", issue);
            }
            (TargetCheck::Mismatch, issues)
        }
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Target check failed: {}", e);
            (TargetCheck::Error, vec![e.to_string()])
        }
    }
}

fn check_file(target_path: &Path, target: &Target) -> io::Result<(TargetCheck, Vec<String>)> {
    if !target_path.is_file() {
        return Ok(error_issue("Target file not found."));
    }

    let expected = match &target.file {
        Some(file) if !file.sha256.trim().is_empty() => file,
        _ => return Ok(error_issue("Manifest missing expected file hash.")),
    };

    if file_matches(target_path, &expected.sha256, expected.size)? {
        Ok((TargetCheck::Match, Vec::new()))
    } else {
        Ok((
            TargetCheck::Mismatch,
            vec!["Target file hash mismatch.".to_string()],
        ))
    }
}

fn check_directory(target_path: &Path, target: &Target) -> io::Result<(TargetCheck, Vec<String>)> {
    if !target_path.is_dir() {
        return Ok(error_issue("Target directory not found."));
    }

    let files = target.files.as_deref().unwrap_or(&[]);
    let new_files = target.new_files.as_deref().unwrap_or(&[]);
    if files.is_empty() && new_files.is_empty() {
        return Ok(error_issue("Manifest missing expected directory checks."));
    }

    let mut issues = Vec::new();

    for item in files {
        let full = match resolve(target_path, &item.path) {
            Some(full) => full,
            None => return Ok(error_issue(&format!("Unsafe path in manifest: {}", item.path))),
        };
        if !full.is_file() {
            issues.push(format!("Missing: {}", item.path));
        } else if !file_matches(&full, &item.sha256, item.size)? {
            issues.push(format!("Mismatch: {}", item.path));
        }
    }

    for path in new_files {
        let full = match resolve(target_path, path) {
            Some(full) => full,
            None => return Ok(error_issue(&format!("Unsafe path in manifest: {}", path))),
        };
        if full.exists() {
            issues.push(format!("Unexpected existing (should be new): {}", path));
        }
    }

    if issues.is_empty() {
        Ok((TargetCheck::Match, issues))
    } else {
        Ok((TargetCheck::Mismatch, issues))
    }
}

/// Hashes the file and compares it with the expected digest. A known size that differs is a mismatch
/// without hashing.
fn file_matches(path: &Path, expected_sha256: &str, expected_size: Option<u64>) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if let Some(expected_size) = expected_size {
        if expected_size != size {
            return Ok(false);
        }
    }
    let actual = sha256_reader(&mut file, size)?;
    if !hex_digest_eq(&actual, expected_sha256) {
        warn!(
            "Hash mismatch for {}: expected={} actual={}",
            path.display(),
            expected_sha256,
            actual
        );
        return Ok(false);
    }
    Ok(true)
}

fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    if !is_safe_relative_path(relative) {
        return None;
    }
    Some(relative.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part)))
}

fn error_issue(issue: &str) -> (TargetCheck, Vec<String>) {
    (TargetCheck::Error, vec![issue.to_string()])
}
