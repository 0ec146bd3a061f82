// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Top-level command line: global logging flags plus one subcommand.

use crate::common::{PROJECT_AUTHOR, PROJECT_DESC, PROJECT_NAME, PROJECT_VERSION};
use crate::subcommands::Subcommand;
use log::LevelFilter;
use structopt::StructOpt;

/// Signs t3pp patches and checks their publisher, payload and target.
#[derive(Debug, StructOpt)]
#[structopt(name=PROJECT_NAME, about=PROJECT_DESC, author=PROJECT_AUTHOR, version=PROJECT_VERSION)]
pub struct T3ppToolApp {
    /// More log output. Once for debug records, twice for trace records.
    #[structopt(short = "v", long = "verbose", parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[structopt(short = "q", long = "quiet", global = true)]
    pub quiet: bool,

    #[structopt(subcommand)]
    pub subcommand: Subcommand,
}

impl T3ppToolApp {
    /// The log level asked for on the command line. `--quiet` wins over `--verbose`.
    pub fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }
}
