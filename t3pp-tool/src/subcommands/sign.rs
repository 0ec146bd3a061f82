// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Signs a patch payload with a publisher key and certificate.

use crate::common::{CERTIFICATE_ENV, PRIVATE_KEY_ENV};
use crate::error::Result;
use crate::util::{get_config_from_command_or_env, parse_patch_mode};
use log::info;
use std::path::Path;
use structopt::StructOpt;
use t3pp::cert::load_certificate;
use t3pp::keys::file::load_private_key;
use t3pp::package::manifest::{ManifestTemplate, PatchMode, Target};
use t3pp::package::target::{describe_directory_target, describe_target};
use t3pp::sign::sign_patch_file;

/// Models the options required by the sign command.
#[derive(Debug, StructOpt)]
pub struct Sign {
    /// The patch payload to sign. It is not modified.
    #[structopt(short = "p", long = "payload")]
    payload_file: String,

    /// The output file, which will contain the signed patch once the process completes.
    #[structopt(short = "o", long = "out-file")]
    output_file: String,

    /// The publisher private key file. Can also be given with the `T3PP_PRIVATE_KEY` environment
    /// variable.
    #[structopt(long = "private-key")]
    private_key: Option<String>,

    /// The publisher certificate file. Can also be given with the `T3PP_CERTIFICATE` environment
    /// variable.
    #[structopt(long = "certificate")]
    certificate: Option<String>,

    /// Whether the patch applies to a single `file` or to a `directory`.
    #[structopt(long = "mode", default_value = "file")]
    mode: String,

    /// The known-good target the patch is meant for. Its current state is recorded in the manifest
    /// so that consumers can detect a patch being applied to the wrong target.
    #[structopt(long = "target")]
    target: Option<String>,

    /// A file the patch creates inside the target directory. May be given more than once.
    #[structopt(long = "new-file", number_of_values = 1)]
    new_files: Vec<String>,

    /// Free-text notes recorded in the signed manifest.
    #[structopt(long = "notes")]
    notes: Option<String>,
}

impl Sign {
    /// Signs the payload and writes the signed patch.
    pub fn run(&self) -> Result<()> {
        let key_path = get_config_from_command_or_env(&self.private_key, PRIVATE_KEY_ENV, "private key")?;
        let cert_path =
            get_config_from_command_or_env(&self.certificate, CERTIFICATE_ENV, "certificate")?;
        let private_key = load_private_key(Path::new(&key_path))?;
        let certificate = load_certificate(Path::new(&cert_path))?;

        let mode = parse_patch_mode(&self.mode)?;
        let target = self.describe_target(mode)?;

        let mut template = ManifestTemplate::for_target(target);
        if let Some(notes) = &self.notes {
            template = template.with_notes(notes);
        }

        let envelope = sign_patch_file(
            Path::new(&self.payload_file),
            Path::new(&self.output_file),
            &certificate,
            &private_key,
            &template,
        )?;
        info!(
            "Signed {} patch written to {} (payload SHA-256 {})",
            self.mode, self.output_file, envelope.manifest.patch_payload_sha256
        );

        Ok(())
    }

    fn describe_target(&self, mode: PatchMode) -> Result<Target> {
        let target = match (&self.target, mode) {
            (Some(path), PatchMode::Directory) => {
                info!("Recording the state of {}", path);
                describe_directory_target(Path::new(path), &self.new_files)?
            }
            (Some(path), PatchMode::File) => {
                info!("Recording the state of {}", path);
                describe_target(Path::new(path), mode)?
            }
            (None, PatchMode::Directory) if !self.new_files.is_empty() => {
                Target::directory(Vec::new(), self.new_files.clone())
            }
            (None, _) => Target::empty(mode),
        };
        Ok(target)
    }
}
