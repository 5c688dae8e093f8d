// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Logging setup
//!
//! The loader logs through `tracing`. Per-module load events (`[cache hit]`,
//! `[native]`, `[transpile]`, ...) are only emitted when the loader was
//! configured with `debug`, so embedders can leave a permissive subscriber
//! installed without flooding it.

use tracing_subscriber::EnvFilter;

/// Emit a debug-level load event when the config's debug flag is set
macro_rules! trace_load {
    ($config:expr, $($arg:tt)+) => {
        if $config.debug {
            tracing::debug!(target: "spacey_loader", $($arg)+);
        }
    };
}

pub(crate) use trace_load;

/// Install a formatting subscriber for embedders that have none.
///
/// `debug` selects `spacey_loader=debug`, otherwise `spacey_loader=warn`.
/// `RUST_LOG` takes precedence when set. Installing twice is a no-op.
pub fn init(debug: bool) {
    let default = if debug {
        "spacey_loader=debug"
    } else {
        "spacey_loader=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
