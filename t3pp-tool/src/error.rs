// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Error definitions/handling.

use thiserror::Error;

/// Errors in t3pp-tool
#[derive(Error, Debug)]
pub enum Error {
    /// Error emanating from standard I/O.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Errors coming from signing or reading a patch, due to the patch being unreadable or malformed in
    /// some way, or a signing precondition not being met.
    #[error(transparent)]
    PatchProcessingError(#[from] t3pp::package::error::Error),

    /// Errors relating to publisher key material.
    #[error(transparent)]
    KeyError(#[from] t3pp::keys::error::KeyError),

    /// Errors relating to JSON processing.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Error emanating from the t3pp-tool itself.
    #[error(transparent)]
    ToolError(#[from] ToolErrorKind),
}

impl Error {
    /// The process exit code for this error. A patch that was refused by `verify` exits with 2 so that
    /// scripts can tell it apart from a command that could not run at all, which exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ToolError(ToolErrorKind::VerificationFailed) => 2,
            _ => 1,
        }
    }
}

/// Errors originating in the t3pp-tool itself.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// There is some missing configuration for a command, such as a required environment variable or
    /// command-line option.
    #[error("Missing configuration")]
    MissingConfiguration,

    /// The patch mode must be either `file` or `directory`.
    #[error("Invalid patch mode")]
    InvalidPatchMode,

    /// Dates are given as `YYYY-MM-DD`.
    #[error("Invalid date")]
    InvalidDate,

    /// The given document is neither a private key nor a publisher certificate.
    #[error("Unrecognized key or certificate document")]
    UnknownDocument,

    /// The patch did not verify to the level that was asked for.
    #[error("Patch verification failed")]
    VerificationFailed,
}

/// A Result type with the Err variant set as a ToolError
pub type Result<T> = std::result::Result<T, Error>;
