// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Force-native / force-convert module matchers

use crate::error::Result;
use regex::Regex;
use std::path::Path;

/// Matches files living inside one of a set of installed packages
/// (`node_modules/<name>/...`).
#[derive(Debug, Clone)]
pub struct ModulePattern {
    regex: Option<Regex>,
}

impl ModulePattern {
    /// Compile a matcher for the given package names
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(Self { regex: None });
        }
        let alternation = names
            .iter()
            .map(|name| regex::escape(name.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("node_modules/({})/", alternation))?;
        Ok(Self { regex: Some(regex) })
    }

    /// Whether `path` is inside one of the packages
    pub fn is_match(&self, path: &Path) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&path.to_string_lossy().replace('\\', "/")),
            None => false,
        }
    }
}

/// Both module matchers, compiled once per loader
#[derive(Debug, Clone)]
pub struct ModulePatterns {
    native: ModulePattern,
    transform: ModulePattern,
}

impl ModulePatterns {
    /// Compile matchers for force-native and force-convert package lists
    pub fn new<S: AsRef<str>>(native: &[S], transform: &[S]) -> Result<Self> {
        Ok(Self {
            native: ModulePattern::new(native)?,
            transform: ModulePattern::new(transform)?,
        })
    }

    /// File must be handed to the host loader untouched
    pub fn is_native(&self, path: &Path) -> bool {
        self.native.is_match(path)
    }

    /// File must always be converted
    pub fn is_transform(&self, path: &Path) -> bool {
        self.transform.is_match(path)
    }
}
