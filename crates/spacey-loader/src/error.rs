// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving, converting or executing a module
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No resolution strategy produced an existing file
    #[error("Error resolving module '{id}': {source}")]
    Resolution {
        /// The request id as given by the caller
        id: String,
        /// Last underlying resolution failure
        #[source]
        source: Box<LoaderError>,
    },

    /// Module not found by a single resolution strategy
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// The conversion engine rejected the source
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The module body failed to compile or threw while running
    #[error("Error executing '{}': {message}", path.display())]
    Execution {
        /// Module filename
        path: PathBuf,
        /// Host supplied message
        message: String,
    },

    /// The host native loader failed
    #[error("Error loading '{id}' natively: {message}")]
    Native {
        /// Request id or filename handed to the host
        id: String,
        /// Host supplied message
        message: String,
    },

    /// Conversion cache directory cannot be created or written
    #[error("Cache directory '{}' is unavailable: {source}", path.display())]
    CacheIo {
        /// Cache directory
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON module or manifest could not be parsed
    #[error("JSON parse error in '{}': {source}", path.display())]
    Json {
        /// File being parsed
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// A `file:` request that is not a valid file URL
    #[error("Invalid file URL: {0}")]
    InvalidUrl(String),

    /// A module name pattern failed to compile
    #[error("Invalid module pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl LoaderError {
    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Wrap the last underlying failure of a resolution chain
    pub fn resolution(id: impl Into<String>, source: LoaderError) -> Self {
        Self::Resolution {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Location-bearing conversion error, if this is one
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            Self::Conversion(err) => Some(err),
            _ => None,
        }
    }
}

/// A syntax conversion failure, normalized with its source location.
///
/// This is also the payload written into the sentinel export field, so its
/// serialized shape is `{filename, line, column, code, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionError {
    /// File being converted
    pub filename: String,
    /// 1-based line, 0 when unknown
    pub line: u32,
    /// Column, 0 when unknown
    pub column: u32,
    /// Engine error code
    pub code: Option<String>,
    /// Cleaned engine message
    pub message: String,
}

impl ConversionError {
    /// `file:line:column` of the failure
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.filename, self.line, self.column)
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code.as_deref().unwrap_or("SyntaxError");
        write!(f, "{}: {} \n {}", code, self.message, self.location())
    }
}

impl std::error::Error for ConversionError {}

/// Error reported by the external conversion engine
#[derive(Debug, Clone, Default, Error)]
#[error("{message}")]
pub struct EngineError {
    /// Engine message
    pub message: String,
    /// Engine error code
    pub code: Option<String>,
    /// Line of the offending token
    pub line: Option<u32>,
    /// Column of the offending token
    pub column: Option<u32>,
}

impl EngineError {
    /// Create an engine error without location
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach a source location
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Attach an error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Errors raised by the host runtime while compiling or running a module
#[derive(Debug, Error)]
pub enum HostError {
    /// The wrapped module source did not compile
    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// The module body threw
    #[error("{0}")]
    Thrown(String),

    /// A nested load issued through the bound `require` failed
    #[error(transparent)]
    Load(Box<LoaderError>),
}

impl HostError {
    /// Create a syntax error
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Create a thrown runtime error
    pub fn thrown(msg: impl Into<String>) -> Self {
        Self::Thrown(msg.into())
    }
}

impl From<LoaderError> for HostError {
    fn from(err: LoaderError) -> Self {
        Self::Load(Box::new(err))
    }
}
