// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Persistent module cache
//!
//! Loaded records kept across top-level loads, keyed by absolute path. The
//! cache is a trait so embedders can share their own registry with the
//! loader, and tests can inspect a private one.

use crate::module_system::record::ModuleRecord;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Path-keyed store of module records
pub trait ModuleCache<V> {
    /// Get a cached record by path
    fn get(&self, path: &Path) -> Option<Rc<ModuleRecord<V>>>;

    /// Add a record to the cache
    fn insert(&self, path: PathBuf, record: Rc<ModuleRecord<V>>);

    /// Remove a record from the cache
    fn remove(&self, path: &Path) -> Option<Rc<ModuleRecord<V>>>;

    /// Get all cached module paths
    fn keys(&self) -> Vec<PathBuf>;

    /// Clear the entire cache
    fn clear(&self);

    /// Check if a module is cached
    fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }
}

/// In-memory module cache owned by one loader
pub struct MemoryModuleCache<V> {
    records: RefCell<HashMap<PathBuf, Rc<ModuleRecord<V>>>>,
}

impl<V> MemoryModuleCache<V> {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
        }
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl<V> Default for MemoryModuleCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ModuleCache<V> for MemoryModuleCache<V> {
    fn get(&self, path: &Path) -> Option<Rc<ModuleRecord<V>>> {
        self.records.borrow().get(path).cloned()
    }

    fn insert(&self, path: PathBuf, record: Rc<ModuleRecord<V>>) {
        self.records.borrow_mut().insert(path, record);
    }

    fn remove(&self, path: &Path) -> Option<Rc<ModuleRecord<V>>> {
        self.records.borrow_mut().remove(path)
    }

    fn keys(&self) -> Vec<PathBuf> {
        self.records.borrow().keys().cloned().collect()
    }

    fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}
