// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// One module instance, created per load and optionally kept in the
/// persistent module cache.
#[derive(Debug)]
pub struct ModuleRecord<V> {
    filename: PathBuf,
    dirname: PathBuf,
    paths: Vec<PathBuf>,
    exports: RefCell<V>,
    loaded: Cell<bool>,
    parent: Option<Weak<ModuleRecord<V>>>,
    children: RefCell<Vec<Rc<ModuleRecord<V>>>>,
}

impl<V: Clone> ModuleRecord<V> {
    /// Create a record for `filename` with fresh `exports`
    pub fn new(filename: PathBuf, exports: V, parent: Option<&Rc<ModuleRecord<V>>>) -> Self {
        let dirname = filename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let paths = node_modules_paths(&dirname);
        Self {
            filename,
            dirname,
            paths,
            exports: RefCell::new(exports),
            loaded: Cell::new(false),
            parent: parent.map(Rc::downgrade),
            children: RefCell::new(Vec::new()),
        }
    }

    /// Absolute path of the module file
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Directory containing the module file
    pub fn dirname(&self) -> &Path {
        &self.dirname
    }

    /// `node_modules` directories searched for bare requests, nearest first
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Current exports handle
    pub fn exports(&self) -> V {
        self.exports.borrow().clone()
    }

    /// Replace the exports handle (`module.exports = ...` in the module body)
    pub fn set_exports(&self, exports: V) {
        *self.exports.borrow_mut() = exports;
    }

    /// Whether the module body finished running
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.set(true);
    }

    /// The record that first required this one, if still alive
    pub fn parent(&self) -> Option<Rc<ModuleRecord<V>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Records required from this one
    pub fn children(&self) -> Vec<Rc<ModuleRecord<V>>> {
        self.children.borrow().clone()
    }

    pub(crate) fn add_child(&self, child: &Rc<ModuleRecord<V>>) {
        let mut children = self.children.borrow_mut();
        if !children.iter().any(|c| Rc::ptr_eq(c, child)) {
            children.push(Rc::clone(child));
        }
    }
}

/// `node_modules` lookup directories for files in `dir`, nearest first.
pub fn node_modules_paths(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .filter(|ancestor| ancestor.file_name().is_none_or(|name| name != "node_modules"))
        .map(|ancestor| ancestor.join("node_modules"))
        .collect()
}
