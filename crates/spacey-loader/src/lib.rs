// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-loader
//!
//! On-demand loading of TypeScript and ESM sources for a host scripting
//! runtime that only executes classic (CommonJS style) modules.
//!
//! A [`Loader`] resolves a request, decides whether the file needs syntax
//! conversion, runs the conversion engine through a content-addressed disk
//! cache, and executes the result through the [`Host`]. Nested `require`
//! calls from running modules re-enter the loader and share a pending map,
//! so circular imports see partially populated exports instead of looping.
//!
//! - Resolution: aliases, conditions-based resolution, classic resolution,
//!   extension probing and `.js` to `.ts` suffix rewriting
//! - Conversion cache keyed by path, source fingerprint and cache version
//! - Configuration merged once from options, environment and defaults
//! - One error funnel: every conversion and execution failure goes through
//!   the configured [`ErrorHandler`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_loader::{Loader, LoaderOptions};
//!
//! let loader = Loader::builder(host, engine)
//!     .anchor("/project/src")
//!     .options(LoaderOptions {
//!         interop_default: Some(true),
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let exports = loader.load("./main.ts")?;
//! ```
//!
//! ## Environment
//!
//! `SPACEY_LOADER_DEBUG`, `SPACEY_LOADER_CACHE`, `SPACEY_LOADER_ESM_RESOLVE`,
//! `SPACEY_LOADER_REQUIRE_CACHE`, `SPACEY_LOADER_ALIAS`,
//! `SPACEY_LOADER_TRANSFORM_MODULES` and `SPACEY_LOADER_NATIVE_MODULES` are
//! read once when the loader is built and only fill options the caller left
//! unset.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod logging;

pub mod alias;
pub mod config;
pub mod error;
pub mod hash;
pub mod host;
pub mod module_system;
pub mod patterns;
pub mod transform;

// Re-exports
pub use config::{CacheSetting, EnvSnapshot, ErrorHandler, LoaderConfig, LoaderOptions};
pub use error::{ConversionError, EngineError, HostError, LoaderError, Result};
pub use host::{Host, ModuleScope, Require};
pub use module_system::{
    wrap_module, HookRegistry, Loader, LoaderBuilder, MemoryModuleCache, ModuleCache, ModuleRecord,
};
pub use transform::{TransformBridge, TransformCache, TransformRequest, TransformResult, Transformer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
