// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host runtime interface
//!
//! The loader never evaluates code itself. A [`Host`] owns the value model,
//! the native module loader, and compilation/execution of wrapped module
//! bodies. During execution the host receives a [`ModuleScope`] whose
//! `require` is bound to the module being run; calling it re-enters the
//! loader for nested requests.

use crate::error::{HostError, Result};
use crate::module_system::ModuleRecord;
use std::path::{Path, PathBuf};

/// A scripting runtime the loader can drive
pub trait Host {
    /// Handle to a runtime value (an exports object, a parsed document...).
    ///
    /// Cloning must yield a handle to the same value, not a copy: exports are
    /// mutated in place and shared with cyclic dependents.
    type Value: Clone + 'static;

    /// A compiled module function
    type Script;

    /// Whether `id` names a runtime built-in (`fs`, `path`, ...)
    fn is_builtin(&self, id: &str) -> bool;

    /// Load `id` through the runtime's own loader, relative to `anchor`
    fn require_native(&self, id: &str, anchor: &Path) -> std::result::Result<Self::Value, HostError>;

    /// A fresh, empty exports object
    fn new_exports(&self) -> Self::Value;

    /// Convert a parsed data document into a runtime value
    fn from_json(&self, value: &serde_json::Value) -> Self::Value;

    /// Define `target.default = value`
    fn set_default(&self, target: &Self::Value, value: Self::Value);

    /// Default-export interop for declarative modules consumed by classic
    /// callers. The default implementation returns the value unchanged.
    fn interop_default(&self, value: &Self::Value) -> Self::Value {
        value.clone()
    }

    /// Compile a module body already wrapped by
    /// [`wrap_module`](crate::module_system::wrap_module)
    fn compile(&self, filename: &Path, wrapped: &str) -> std::result::Result<Self::Script, HostError>;

    /// Run a compiled module function
    fn execute(
        &self,
        script: &Self::Script,
        scope: ModuleScope<'_, Self::Value>,
    ) -> std::result::Result<(), HostError>;
}

/// The loading function handed to a running module
pub trait Require<V> {
    /// Load a nested module
    fn require(&self, id: &str) -> Result<V>;

    /// Resolve a nested request without loading it
    fn resolve(&self, id: &str, paths: Option<&[PathBuf]>) -> Result<PathBuf>;
}

/// Arguments of the module function envelope
pub struct ModuleScope<'a, V> {
    /// `exports`
    pub exports: V,
    /// `require`, bound to this module
    pub require: &'a dyn Require<V>,
    /// `module`
    pub module: &'a ModuleRecord<V>,
    /// `__filename`
    pub filename: &'a Path,
    /// `__dirname`
    pub dirname: &'a Path,
}
