// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! t3pp-tool: signs t3pp patch files and verifies them before they are applied.

use log::{debug, error};
use structopt::StructOpt;
use t3pp_tool::cli::T3ppToolApp;

fn main() {
    let app = T3ppToolApp::from_args();

    // RUST_LOG still overrides the level picked on the command line.
    env_logger::Builder::new()
        .filter_level(app.log_level())
        .format_timestamp(None)
        .format_module_path(false)
        .parse_default_env()
        .init();
    debug!("{:?}", app);

    if let Err(e) = app.subcommand.run() {
        error!("Command failed: {} ({:?})", e, e);
        std::process::exit(e.exit_code());
    }
}
