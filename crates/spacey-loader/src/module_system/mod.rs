// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module system
//!
//! Resolution, module records, the persistent module cache and the loader
//! that ties them to the conversion bridge and the host.

mod cache;
pub mod esm;
pub mod kind;
mod loader;
pub mod package;
mod record;
mod resolver;

pub use cache::{MemoryModuleCache, ModuleCache};
pub use esm::{has_esm_syntax, is_native_esm};
pub use loader::{wrap_module, HookRegistry, Loader, LoaderBuilder};
pub use record::{node_modules_paths, ModuleRecord};
pub use resolver::ModuleResolver;
