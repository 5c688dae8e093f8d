// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration
//!
//! A [`LoaderConfig`] is built exactly once per loader by merging, in order of
//! precedence:
//!
//! 1. explicit [`LoaderOptions`] from the caller,
//! 2. an [`EnvSnapshot`] of the `SPACEY_LOADER_*` variables,
//! 3. built-in defaults.
//!
//! The environment is read when the snapshot is captured and never again.

use crate::error::{LoaderError, Result};
use crate::hash::hash_options;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Version baked into every cache trailer
pub const DEFAULT_CACHE_VERSION: &str = "1";

/// Directory name used under the temp directory for cached conversions
pub const CACHE_DIR_NAME: &str = "spacey-loader";

/// Extensions handled by the loader, in probing order
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".ts", ".mts", ".cts", ".json"];

/// Packages that are always loaded natively
pub const ALWAYS_NATIVE: &[&str] = &["typescript", "spacey-loader"];

/// Environment variable names
pub mod vars {
    /// Debug tracing
    pub const DEBUG: &str = "SPACEY_LOADER_DEBUG";
    /// Conversion cache on/off
    pub const CACHE: &str = "SPACEY_LOADER_CACHE";
    /// Declarative (conditions based) resolution
    pub const ESM_RESOLVE: &str = "SPACEY_LOADER_ESM_RESOLVE";
    /// Persistent module cache
    pub const REQUIRE_CACHE: &str = "SPACEY_LOADER_REQUIRE_CACHE";
    /// Alias table as a JSON object
    pub const ALIAS: &str = "SPACEY_LOADER_ALIAS";
    /// Force-convert package list
    pub const TRANSFORM_MODULES: &str = "SPACEY_LOADER_TRANSFORM_MODULES";
    /// Force-native package list
    pub const NATIVE_MODULES: &str = "SPACEY_LOADER_NATIVE_MODULES";
    /// Keep `TMPDIR` even when it points at the working directory
    pub const RESPECT_TMPDIR: &str = "SPACEY_LOADER_RESPECT_TMPDIR_ENV";
    /// System temp directory override
    pub const TMPDIR: &str = "TMPDIR";
}

/// Conversion cache setting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    /// Cache in the default temp location, or not at all
    Enabled(bool),
    /// Cache in an explicit directory
    Dir(PathBuf),
}

/// Callback every fatal-class loader error is funneled through.
///
/// Returning `Err` aborts the whole top-level load; returning `Ok(())`
/// swallows the error and lets the load return partial exports.
#[derive(Clone)]
pub struct ErrorHandler(Rc<dyn Fn(LoaderError) -> Result<()>>);

impl ErrorHandler {
    /// Wrap a callback
    pub fn new(handler: impl Fn(LoaderError) -> Result<()> + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// The default handler: hand the error straight back to the caller
    pub fn rethrow() -> Self {
        Self::new(Err)
    }

    /// Report an error
    pub fn call(&self, err: LoaderError) -> Result<()> {
        (self.0)(err)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::rethrow()
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler")
    }
}

/// Caller supplied options. Every field is optional; unset fields fall back
/// to the environment and then to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderOptions {
    /// Emit load tracing events
    pub debug: Option<bool>,
    /// Conversion cache
    pub cache: Option<CacheSetting>,
    /// Keep loaded records across loads
    pub persistent_module_cache: Option<bool>,
    /// Unwrap `default` exports at the outer boundary
    pub interop_default: Option<bool>,
    /// Try conditions based resolution first
    pub declarative_resolve: Option<bool>,
    /// Cache version baked into trailers
    pub cache_version: Option<String>,
    /// Recognized extensions
    pub extensions: Option<Vec<String>>,
    /// Prefix aliases
    pub alias: Option<IndexMap<String, String>>,
    /// Packages to always load natively
    pub native_modules: Option<Vec<String>>,
    /// Packages to always convert
    pub transform_modules: Option<Vec<String>>,
    /// Opaque options passed to the conversion engine
    pub transform_options: Option<Json>,
    /// Error callback
    #[serde(skip)]
    pub on_error: Option<ErrorHandler>,
}

/// Point-in-time copy of the environment relevant to the loader
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
    cwd: PathBuf,
}

impl EnvSnapshot {
    /// Capture the current process environment and working directory
    pub fn capture() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::from_vars(std::env::vars(), cwd)
    }

    /// Build a snapshot from explicit variables
    pub fn from_vars<I, K, V>(vars: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            cwd: cwd.into(),
        }
    }

    /// Working directory at capture time
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Raw variable value
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variable parsed as a loosely typed literal; `undefined` counts as unset
    pub fn literal(&self, name: &str) -> Option<Json> {
        let raw = self.var(name)?;
        if raw.trim() == "undefined" {
            return None;
        }
        Some(parse_literal(raw))
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.literal(name).map(|v| truthy(&v))
    }

    fn list(&self, name: &str) -> Option<Vec<String>> {
        match self.literal(name)? {
            Json::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Json::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            Json::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => None,
        }
    }

    fn alias(&self, name: &str) -> Option<IndexMap<String, String>> {
        match self.literal(name)? {
            Json::Object(map) => Some(
                map.into_iter()
                    .filter_map(|(k, v)| match v {
                        Json::String(to) => Some((k, to)),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Parse a loosely typed literal: booleans, `null`, numbers and JSON parse as
/// such; anything else is kept as a string.
pub fn parse_literal(raw: &str) -> Json {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return Json::Bool(true),
        "false" => return Json::Bool(false),
        "null" => return Json::Null,
        _ => {}
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Json::String(raw.to_string()))
}

/// Truthiness of a literal
pub fn truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

/// Immutable, fully merged loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Emit load tracing events
    pub debug: bool,
    /// Conversion cache directory; `None` disables the conversion cache
    pub cache_dir: Option<PathBuf>,
    /// Keep loaded records across loads
    pub persistent_module_cache: bool,
    /// Unwrap `default` exports at the outer boundary
    pub interop_default: bool,
    /// Try conditions based resolution first
    pub declarative_resolve: bool,
    /// Cache version, salted with the transform options hash when present
    pub cache_version: String,
    /// Recognized extensions
    pub extensions: Vec<String>,
    /// Prefix aliases, not yet normalized
    pub alias: IndexMap<String, String>,
    /// Packages always loaded natively
    pub native_modules: Vec<String>,
    /// Packages always converted
    pub transform_modules: Vec<String>,
    /// Opaque conversion engine options
    pub transform_options: Json,
    /// Error callback
    pub on_error: ErrorHandler,
}

impl LoaderConfig {
    /// Merge explicit options over the environment over defaults
    pub fn resolve(options: LoaderOptions, env: &EnvSnapshot) -> Self {
        let cache = options.cache.unwrap_or_else(|| {
            CacheSetting::Enabled(env.flag(vars::CACHE).unwrap_or(true))
        });
        let cache_dir = match cache {
            CacheSetting::Enabled(true) => Some(default_cache_dir(env)),
            CacheSetting::Enabled(false) => None,
            CacheSetting::Dir(dir) => Some(dir),
        };

        let mut cache_version = options
            .cache_version
            .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string());
        if let Some(transform_options) = &options.transform_options {
            cache_version = format!("{}-{}", cache_version, hash_options(transform_options));
        }

        let mut native_modules: Vec<String> =
            ALWAYS_NATIVE.iter().map(|s| s.to_string()).collect();
        native_modules.extend(
            options
                .native_modules
                .or_else(|| env.list(vars::NATIVE_MODULES))
                .unwrap_or_default(),
        );

        Self {
            debug: options
                .debug
                .or_else(|| env.flag(vars::DEBUG))
                .unwrap_or(false),
            cache_dir,
            persistent_module_cache: options
                .persistent_module_cache
                .or_else(|| env.flag(vars::REQUIRE_CACHE))
                .unwrap_or(true),
            interop_default: options.interop_default.unwrap_or(false),
            declarative_resolve: options
                .declarative_resolve
                .or_else(|| env.flag(vars::ESM_RESOLVE))
                .unwrap_or(false),
            cache_version,
            extensions: options.extensions.unwrap_or_else(|| {
                DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
            }),
            alias: options
                .alias
                .or_else(|| env.alias(vars::ALIAS))
                .unwrap_or_default(),
            native_modules,
            transform_modules: options
                .transform_modules
                .or_else(|| env.list(vars::TRANSFORM_MODULES))
                .unwrap_or_default(),
            transform_options: options
                .transform_options
                .unwrap_or_else(|| Json::Object(Default::default())),
            on_error: options.on_error.unwrap_or_default(),
        }
    }

    /// Whether `ext` (with leading dot) is recognized
    pub fn is_recognized(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::resolve(LoaderOptions::default(), &EnvSnapshot::default())
    }
}

/// Default conversion cache directory: `<tmp>/spacey-loader`.
///
/// Some package managers export `TMPDIR` as the project directory; when
/// `TMPDIR` equals the working directory the system temp directory is used
/// instead, unless `SPACEY_LOADER_RESPECT_TMPDIR_ENV` is set.
pub fn default_cache_dir(env: &EnvSnapshot) -> PathBuf {
    let respect = env.flag(vars::RESPECT_TMPDIR).unwrap_or(false);
    let tmp = match env.var(vars::TMPDIR) {
        Some(dir) if !dir.is_empty() => {
            if Path::new(dir) == env.cwd() && !respect {
                system_temp_dir()
            } else {
                PathBuf::from(dir)
            }
        }
        _ => system_temp_dir(),
    };
    tmp.join(CACHE_DIR_NAME)
}

fn system_temp_dir() -> PathBuf {
    if cfg!(unix) {
        PathBuf::from("/tmp")
    } else {
        std::env::temp_dir()
    }
}
