// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Project metadata shown by the command-line interface.

pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");
pub const PROJECT_DESC: &str = env!("CARGO_PKG_DESCRIPTION");
pub const PROJECT_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the publisher private key file.
pub const PRIVATE_KEY_ENV: &str = "T3PP_PRIVATE_KEY";

/// Environment variable naming the publisher certificate file.
pub const CERTIFICATE_ENV: &str = "T3PP_CERTIFICATE";

/// Environment variable naming an additional trust file of publisher fingerprints.
pub const TRUST_FILE_ENV: &str = "T3PP_TRUST_FILE";
