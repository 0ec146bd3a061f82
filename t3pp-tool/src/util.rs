// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! General-purpose utilities used throughout the t3pp-tool crate.

use crate::error::{Error, Result, ToolErrorKind};
use chrono::NaiveDate;
use log::error;
use t3pp::package::manifest::PatchMode;

/// Utility to get a string value either from a command-line option or a named environment variable.
pub fn get_config_from_command_or_env(
    config_option: &Option<String>,
    env_var_name: &str,
    purpose: &str,
) -> Result<String> {
    match get_optional_config_from_command_or_env(config_option, env_var_name) {
        Some(value) => Ok(value),
        None => {
            error!(
                "No {} specified. Please specify on the command-line or by setting the `{}` environment variable.",
                purpose, env_var_name
            );
            Err(Error::ToolError(ToolErrorKind::MissingConfiguration))
        }
    }
}

/// Like [get_config_from_command_or_env], for settings that may be left out entirely.
pub fn get_optional_config_from_command_or_env(
    config_option: &Option<String>,
    env_var_name: &str,
) -> Option<String> {
    match config_option {
        Some(o) => Some(o.clone()),
        None => std::env::var(env_var_name)
            .ok()
            .filter(|value| !value.trim().is_empty()),
    }
}

/// Parses a patch mode given as `file` or `directory`, in any case.
pub fn parse_patch_mode(text: &str) -> Result<PatchMode> {
    match text.trim().to_ascii_lowercase().as_str() {
        "file" => Ok(PatchMode::File),
        "directory" | "dir" => Ok(PatchMode::Directory),
        _ => Err(Error::ToolError(ToolErrorKind::InvalidPatchMode)),
    }
}

/// Parses a calendar date given as `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_e| Error::ToolError(ToolErrorKind::InvalidDate))
}
