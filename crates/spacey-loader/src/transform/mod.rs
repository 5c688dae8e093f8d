// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bridge to the external syntax conversion engine
//!
//! The engine is an opaque [`Transformer`]. The bridge never fails: an engine
//! error becomes a [`ConversionError`] plus replacement code that assigns the
//! error to the sentinel export field, so hosts running converted code through
//! their own hooks still see the failure once the module executes.

mod cache;

pub use cache::TransformCache;

use crate::error::{ConversionError, EngineError};
use crate::module_system::kind::{is_jsx_file, is_typescript_file};
use regex::Regex;
use serde_json::{json, Value as Json};
use std::path::Path;
use std::sync::LazyLock;

/// Export field carrying a deferred conversion error
pub const SENTINEL_FIELD: &str = "__SPACEY_LOADER_ERROR__";

static TRAILING_LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.+\)\s*$").expect("static regex"));

static NO_OPTIONS: Json = Json::Null;

/// One conversion request
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    /// Absolute path of the file being converted
    pub filename: &'a Path,
    /// Original source text
    pub source: &'a str,
    /// Strip type annotations
    pub typescript: bool,
    /// Convert markup syntax
    pub jsx: bool,
    /// Rewrite `import`/`export` into the classic convention
    pub declarative: bool,
    /// Opaque engine options
    pub options: &'a Json,
}

impl<'a> TransformRequest<'a> {
    /// Request with dialect flags derived from the file extension
    pub fn new(filename: &'a Path, source: &'a str) -> Self {
        Self {
            filename,
            source,
            typescript: is_typescript_file(filename),
            jsx: is_jsx_file(filename),
            declarative: true,
            options: &NO_OPTIONS,
        }
    }

    /// Override the type-annotation flag
    pub fn typescript(mut self, typescript: bool) -> Self {
        self.typescript = typescript;
        self
    }

    /// Attach engine options
    pub fn with_options(mut self, options: &'a Json) -> Self {
        self.options = options;
        self
    }
}

/// Converted code, plus the normalized error when conversion failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Converted code, or sentinel-assigning code on failure
    pub code: String,
    /// Conversion failure
    pub error: Option<ConversionError>,
}

impl TransformResult {
    /// Whether conversion succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The external conversion engine
pub trait Transformer {
    /// Convert `request.source` into code the host can execute
    fn transform(&self, request: &TransformRequest<'_>) -> Result<String, EngineError>;
}

impl<F> Transformer for F
where
    F: Fn(&TransformRequest<'_>) -> Result<String, EngineError>,
{
    fn transform(&self, request: &TransformRequest<'_>) -> Result<String, EngineError> {
        self(request)
    }
}

/// Adapter normalizing engine failures
#[derive(Debug, Clone)]
pub struct TransformBridge<T> {
    engine: T,
}

impl<T: Transformer> TransformBridge<T> {
    /// Wrap an engine
    pub fn new(engine: T) -> Self {
        Self { engine }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &T {
        &self.engine
    }

    /// Convert a request; never fails
    pub fn convert(&self, request: &TransformRequest<'_>) -> TransformResult {
        match self.engine.transform(request) {
            Ok(code) => TransformResult { code, error: None },
            Err(err) => {
                let error = normalize_error(request.filename, err);
                TransformResult {
                    code: sentinel_code(&error),
                    error: Some(error),
                }
            }
        }
    }
}

/// Code assigning `error` to the sentinel export field
pub fn sentinel_code(error: &ConversionError) -> String {
    let payload = json!({
        "filename": error.filename,
        "line": error.line,
        "column": error.column,
        "code": error.code,
        "message": error.message,
    });
    format!("exports.{} = {};", SENTINEL_FIELD, payload)
}

/// Whether `code` carries a sentinel error payload
pub fn is_sentinel(code: &str) -> bool {
    code.contains(SENTINEL_FIELD)
}

fn normalize_error(filename: &Path, err: EngineError) -> ConversionError {
    let message = err.message.replacen("/: ", "", 1);
    let message = TRAILING_LOCATION_RE.replace(&message, "").into_owned();
    ConversionError {
        filename: filename.display().to_string(),
        line: err.line.unwrap_or(0),
        column: err.column.unwrap_or(0),
        code: err.code,
        message,
    }
}
