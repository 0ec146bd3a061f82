// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Creates a publisher certificate for an existing private key.

use crate::common::PRIVATE_KEY_ENV;
use crate::error::Result;
use crate::util::{get_config_from_command_or_env, parse_date};
use chrono::Utc;
use log::info;
use std::path::Path;
use structopt::StructOpt;
use t3pp::cert::{save_certificate, PublisherCertificate};
use t3pp::keys::file::load_private_key;

/// Models the options required by the cert command.
#[derive(Debug, StructOpt)]
pub struct Cert {
    /// The publisher private key file. Can also be given with the `T3PP_PRIVATE_KEY` environment
    /// variable.
    #[structopt(long = "private-key")]
    private_key: Option<String>,

    /// The source (author) of the patches signed with this certificate.
    #[structopt(long = "source")]
    source: String,

    /// The distributor of the patches signed with this certificate.
    #[structopt(long = "distributor")]
    distributor: String,

    /// The certificate serial number. A random one is generated if none is given.
    #[structopt(long = "serial")]
    serial: Option<String>,

    /// The first day of validity, as `YYYY-MM-DD`. Defaults to today when a validity period is given.
    #[structopt(long = "valid-from")]
    valid_from: Option<String>,

    /// The number of days the certificate is valid for. Takes precedence over `--valid-until`. The
    /// certificate has no end date if neither is given.
    #[structopt(long = "valid-days")]
    valid_days: Option<u32>,

    /// The last day of validity, as `YYYY-MM-DD`.
    #[structopt(long = "valid-until")]
    valid_until: Option<String>,

    /// The informational usage tag.
    #[structopt(long = "usage")]
    usage: Option<String>,

    /// The output file for the certificate.
    #[structopt(short = "o", long = "out-file")]
    output_file: String,
}

impl Cert {
    /// Creates the certificate and writes it to the output file.
    pub fn run(&self) -> Result<()> {
        let key_path = get_config_from_command_or_env(&self.private_key, PRIVATE_KEY_ENV, "private key")?;
        let private_key = load_private_key(Path::new(&key_path))?;
        // Fails early if the key file has been tampered with.
        private_key.to_signing_key()?;

        let mut certificate = PublisherCertificate::new(
            &self.source,
            &self.distributor,
            self.serial.as_deref().unwrap_or(""),
            private_key.public_key.clone(),
        );

        let first_day = match &self.valid_from {
            Some(text) => Some(parse_date(text)?),
            None => None,
        };
        if let Some(days) = self.valid_days {
            let first_day = first_day.unwrap_or_else(|| Utc::now().date_naive());
            certificate = certificate.valid_for_days(first_day, days);
        } else if let Some(text) = &self.valid_until {
            let last_day = parse_date(text)?;
            let first_day = first_day.unwrap_or_else(|| Utc::now().date_naive());
            certificate = certificate.with_validity_dates(first_day, last_day);
        } else if let Some(first_day) = first_day {
            certificate = certificate.valid_from_date(first_day);
        }

        if let Some(usage) = &self.usage {
            certificate = certificate.with_usage(usage);
        }

        save_certificate(Path::new(&self.output_file), &certificate)?;
        info!(
            "Certificate {} written to {}",
            certificate.serial_number, self.output_file
        );
        println!("{}", certificate.fingerprint()?);

        Ok(())
    }
}
