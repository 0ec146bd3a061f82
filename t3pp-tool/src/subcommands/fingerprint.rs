// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Prints the publisher fingerprint of a private key or certificate file.

use crate::error::{Error, Result, ToolErrorKind};
use std::fs::File;
use std::io::BufReader;
use structopt::StructOpt;
use t3pp::cert::PublisherCertificate;
use t3pp::keys::{PrivateKey, PRIVATE_KEY_FORMAT};
use t3pp::package::PUBLISHER_CERTIFICATE_FORMAT;

/// Models the options required by the fingerprint command.
#[derive(Debug, StructOpt)]
pub struct Fingerprint {
    /// A private key or publisher certificate file.
    file: String,
}

impl Fingerprint {
    /// Identifies the document by its format tag and prints the fingerprint of its public key.
    pub fn run(&self) -> Result<()> {
        let document: serde_json::Value =
            serde_json::from_reader(BufReader::new(File::open(&self.file)?))?;
        let format = document
            .get("format")
            .and_then(|f| f.as_str())
            .unwrap_or_default()
            .to_string();

        let fingerprint = if format.eq_ignore_ascii_case(PRIVATE_KEY_FORMAT) {
            let key: PrivateKey = serde_json::from_value(document)?;
            key.fingerprint()?
        } else if format.eq_ignore_ascii_case(PUBLISHER_CERTIFICATE_FORMAT) {
            let certificate: PublisherCertificate = serde_json::from_value(document)?;
            certificate.fingerprint()?
        } else {
            return Err(Error::ToolError(ToolErrorKind::UnknownDocument));
        };

        println!("{}", fingerprint);
        Ok(())
    }
}
