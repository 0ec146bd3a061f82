// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Command-line front end for the `t3pp` crate: publisher key and certificate management, patch
//! signing and patch verification.

pub mod cli;
pub mod common;
pub mod error;
pub mod subcommands;
pub mod util;
