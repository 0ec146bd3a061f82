// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Timed log scopes around long-running operations.

use log::info;
use std::time::Instant;

/// Logs `==> name` when created and `<== name (N ms)` when dropped.
pub(crate) struct LogStep {
    name: &'static str,
    started: Instant,
}

impl LogStep {
    pub(crate) fn begin(name: &'static str) -> LogStep {
        info!("==> {}", name);
        LogStep {
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for LogStep {
    fn drop(&mut self) {
        info!("<== {} ({} ms)", self.name, self.started.elapsed().as_millis());
    }
}
