// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Subcommand implementations.

mod cert;
mod fingerprint;
mod keygen;
mod sign;
mod verify;

use crate::error::Result;
use crate::subcommands::cert::Cert;
use crate::subcommands::fingerprint::Fingerprint;
use crate::subcommands::keygen::KeyGen;
use crate::subcommands::sign::Sign;
use crate::subcommands::verify::Verify;
use structopt::StructOpt;

/// Command-line interface to t3pp-tool operations.
#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Generates a new publisher key pair, writes the private key to a file and prints the public key
    /// fingerprint.
    #[structopt(name = "keygen")]
    KeyGen(KeyGen),

    /// Creates a publisher certificate for a private key.
    Cert(Cert),

    /// Prints the fingerprint of a private key or publisher certificate file.
    Fingerprint(Fingerprint),

    /// Signs a patch payload, producing a signed patch file.
    Sign(Sign),

    /// Verifies a patch file, optionally checking it against the target it will be applied to.
    Verify(Verify),
}

impl Subcommand {
    /// Runs the command.
    pub fn run(&self) -> Result<()> {
        match &self {
            Subcommand::KeyGen(cmd) => cmd.run(),
            Subcommand::Cert(cmd) => cmd.run(),
            Subcommand::Fingerprint(cmd) => cmd.run(),
            Subcommand::Sign(cmd) => cmd.run(),
            Subcommand::Verify(cmd) => cmd.run(),
        }
    }
}
