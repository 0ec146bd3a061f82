// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Verifies a patch file and prints the verification report.

use crate::common::TRUST_FILE_ENV;
use crate::error::{Error, Result, ToolErrorKind};
use crate::util::get_optional_config_from_command_or_env;
use log::{error, warn};
use std::path::Path;
use structopt::StructOpt;
use t3pp::trust::builtin::BuiltinTrustStore;
use t3pp::trust::file::FileTrustStore;
use t3pp::trust::{ChainedTrust, TrustProvider};
use t3pp::verify::{TargetCheck, VerificationReport, VerificationState, Verifier};

/// Models the options required by the verify command.
#[derive(Debug, StructOpt)]
pub struct Verify {
    /// The patch file to verify.
    patch_file: String,

    /// The file or directory the patch will be applied to.
    #[structopt(long = "target")]
    target: Option<String>,

    /// A JSON file of additional trusted publisher fingerprints. Can also be given with the
    /// `T3PP_TRUST_FILE` environment variable.
    #[structopt(long = "trust-file")]
    trust_file: Option<String>,

    /// Only succeed if the patch is verified and matches the target. Without this, only invalid patches
    /// fail.
    #[structopt(long = "strict")]
    strict: bool,
}

impl Verify {
    /// Verifies the patch and prints the report.
    pub fn run(&self) -> Result<()> {
        let builtin = BuiltinTrustStore::new();
        let extra = match get_optional_config_from_command_or_env(&self.trust_file, TRUST_FILE_ENV) {
            Some(path) => FileTrustStore::from_file_path(Path::new(&path))?,
            None => FileTrustStore::default(),
        };
        let providers: Vec<&dyn TrustProvider> = vec![&builtin, &extra];
        let trust = ChainedTrust::new(providers);

        let verifier = Verifier::new(&trust);
        let report = verifier.verify(
            Path::new(&self.patch_file),
            self.target.as_deref().map(Path::new),
        );
        print_report(&report);

        if report.state == VerificationState::Invalid {
            error!("The patch must not be applied.");
            return Err(Error::ToolError(ToolErrorKind::VerificationFailed));
        }

        if self.strict {
            let target_ok = matches!(
                report.target_check,
                TargetCheck::NotChecked | TargetCheck::Match
            );
            if !report.is_verified() || !target_ok {
                warn!("The patch did not pass strict verification.");
                return Err(Error::ToolError(ToolErrorKind::VerificationFailed));
            }
        }

        Ok(())
    }
}

fn print_report(report: &VerificationReport) {
    println!("Status:        {}", report.status_text());
    if let Some(publisher) = &report.publisher {
        println!("Source:        {}", publisher.source);
        println!("Distributor:   {}", publisher.distributor);
        println!("Serial:        {}", publisher.serial_number);
        let day = |bound: Option<chrono::DateTime<chrono::Utc>>| {
            bound
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "Validity:      {} to {} ({:?})",
            day(publisher.not_before_utc),
            day(publisher.not_after_utc),
            report.certificate_validity
        );
    }
    if let Some(fingerprint) = &report.publisher_fingerprint {
        println!("Fingerprint:   {}", fingerprint);
    }
    if let Some(manifest) = &report.manifest {
        println!("Mode:          {:?}", manifest.patch_mode);
        println!("Created:       {}", manifest.created_at_utc.to_rfc3339());
        if let Some(notes) = &manifest.notes {
            println!("Notes:         {}", notes);
        }
        println!("Target:        {:?}", report.target_check);
    }
    for issue in &report.target_issues {
        println!("  {}", issue);
    }
    println!();
    println!("{}", report.summary());
}
