// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Generates a new publisher key pair.

use crate::error::Result;
use log::{info, warn};
use std::path::Path;
use structopt::StructOpt;
use t3pp::keys::file::save_private_key;
use t3pp::keys::local::generate_key_pair;

/// Models the options required by the keygen command.
#[derive(Debug, StructOpt)]
pub struct KeyGen {
    /// The output file for the private key. Keep it secret: anyone holding it can sign patches as
    /// this publisher.
    #[structopt(short = "o", long = "out-file")]
    output_file: String,

    /// Overwrite the output file if it already exists.
    #[structopt(long = "force")]
    force: bool,
}

impl KeyGen {
    /// Generates the key pair, saves the private key and prints the fingerprint.
    pub fn run(&self) -> Result<()> {
        let output = Path::new(&self.output_file);
        if output.exists() && !self.force {
            warn!("{} already exists. Use --force to overwrite it.", output.display());
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "refusing to overwrite an existing private key",
            )
            .into());
        }

        let (private_key, _, fingerprint) = generate_key_pair();
        save_private_key(output, &private_key)?;
        info!("Private key written to {}", output.display());

        // Print just the fingerprint, so that scripts can capture it.
        println!("{}", fingerprint);

        Ok(())
    }
}
