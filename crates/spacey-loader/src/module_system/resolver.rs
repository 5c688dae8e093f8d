// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution
//!
//! Strategies are tried in order, first success wins:
//!
//! 1. alias substitution,
//! 2. declarative (conditions based) resolution, when enabled,
//! 3. classic resolution (extension probing, directory index, `main`),
//! 4. `id + ext` and `id + "/index" + ext` for every other recognized extension,
//! 5. `.js`-family suffixes rewritten to their typed counterpart, when the
//!    requesting file is itself typed.

use crate::alias::AliasTable;
use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::module_system::kind::{is_typescript_file, typescript_counterpart};
use crate::module_system::package::{parse_package_specifier, PackageJson};
use crate::module_system::record::node_modules_paths;
use std::path::{Path, PathBuf};

/// Extensions probed by classic resolution
const CLASSIC_EXTENSIONS: &[&str] = &[".js", ".json", ".node"];

/// Extensions probed by declarative resolution
const DECLARATIVE_EXTENSIONS: &[&str] = &[".mjs", ".cjs", ".js", ".json"];

/// Condition sets for declarative resolution, in order
const CONDITION_SETS: &[&[&str]] = &[&["node", "require"], &["node", "import"]];

/// Conditions used for `exports` maps during classic resolution
const CLASSIC_CONDITIONS: &[&str] = &["node", "require"];

/// Module resolver
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    aliases: Option<AliasTable>,
    declarative: bool,
    /// Recognized extensions other than `.js`, in probing order
    extensions: Vec<String>,
}

impl ModuleResolver {
    /// Build a resolver from loader configuration
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            aliases: AliasTable::new(&config.alias),
            declarative: config.declarative_resolve,
            extensions: config
                .extensions
                .iter()
                .filter(|ext| ext.as_str() != ".js")
                .cloned()
                .collect(),
        }
    }

    /// Resolve `id` requested from the file `anchor`.
    ///
    /// `paths` replaces the anchor's directory as the lookup base.
    pub fn resolve(&self, id: &str, anchor: &Path, paths: Option<&[PathBuf]>) -> Result<PathBuf> {
        let id = match &self.aliases {
            Some(table) => table.resolve(id),
            None => id.to_string(),
        };

        if self.declarative {
            for conditions in CONDITION_SETS {
                if let Ok(path) = self.resolve_declarative(&id, anchor, conditions) {
                    return Ok(path);
                }
            }
        }

        let last_err = match self.resolve_classic(&id, anchor, paths) {
            Ok(path) => return Ok(path),
            Err(err) => err,
        };

        for ext in &self.extensions {
            for candidate in [format!("{}{}", id, ext), format!("{}/index{}", id, ext)] {
                if let Ok(path) = self.resolve_classic(&candidate, anchor, paths) {
                    return Ok(path);
                }
            }
        }

        if is_typescript_file(anchor) {
            if let Some(rewritten) = typescript_counterpart(&id) {
                return self
                    .resolve_classic(&rewritten, anchor, paths)
                    .map_err(|err| LoaderError::resolution(id.as_str(), err));
            }
        }

        Err(LoaderError::resolution(id, last_err))
    }

    /// Classic synchronous resolution
    pub fn resolve_classic(
        &self,
        id: &str,
        anchor: &Path,
        paths: Option<&[PathBuf]>,
    ) -> Result<PathBuf> {
        let bases = base_dirs(anchor, paths);

        if is_path_like(id) {
            for base in &bases {
                let candidate = base.join(id);
                if let Some(found) =
                    load_as_file(&candidate, CLASSIC_EXTENSIONS).or_else(|| load_as_directory(&candidate))
                {
                    return Ok(canonical(found));
                }
            }
            return Err(LoaderError::module_not_found(id));
        }

        let (name, subpath) = parse_package_specifier(id);
        for node_modules in bases.iter().flat_map(|base| node_modules_paths(base)) {
            let package_dir = node_modules.join(name);
            if !package_dir.is_dir() {
                continue;
            }
            if let Some(pkg) = PackageJson::read(&package_dir) {
                if pkg.exports.is_some() {
                    let export = export_subpath(subpath);
                    if let Some(found) = pkg.resolve_export(&package_dir, &export, CLASSIC_CONDITIONS) {
                        return Ok(canonical(found));
                    }
                    continue;
                }
            }
            let candidate = node_modules.join(id);
            if let Some(found) =
                load_as_file(&candidate, CLASSIC_EXTENSIONS).or_else(|| load_as_directory(&candidate))
            {
                return Ok(canonical(found));
            }
        }

        Err(LoaderError::module_not_found(id))
    }

    /// Conditions-based resolution with one condition set
    pub fn resolve_declarative(&self, id: &str, anchor: &Path, conditions: &[&str]) -> Result<PathBuf> {
        let base = anchor_dir(anchor);

        if let Some(location) = id.strip_prefix("file://") {
            return load_declarative(Path::new(location))
                .map(canonical)
                .ok_or_else(|| LoaderError::module_not_found(id));
        }

        if is_path_like(id) {
            return load_declarative(&base.join(id))
                .map(canonical)
                .ok_or_else(|| LoaderError::module_not_found(id));
        }

        let (name, subpath) = parse_package_specifier(id);
        for node_modules in node_modules_paths(&base) {
            let package_dir = node_modules.join(name);
            if !package_dir.is_dir() {
                continue;
            }
            let pkg = PackageJson::read(&package_dir).unwrap_or_default();
            if pkg.exports.is_some() {
                let export = export_subpath(subpath);
                return pkg
                    .resolve_export(&package_dir, &export, conditions)
                    .map(canonical)
                    .ok_or_else(|| LoaderError::module_not_found(id));
            }
            let found = match subpath {
                Some(sub) => load_declarative(&package_dir.join(sub)),
                None => pkg
                    .main
                    .as_deref()
                    .and_then(|main| load_declarative(&package_dir.join(main)))
                    .or_else(|| load_declarative(&package_dir.join("index"))),
            };
            if let Some(found) = found {
                return Ok(canonical(found));
            }
        }

        Err(LoaderError::module_not_found(id))
    }
}

fn is_path_like(id: &str) -> bool {
    id == "."
        || id == ".."
        || id.starts_with("./")
        || id.starts_with("../")
        || Path::new(id).is_absolute()
}

fn anchor_dir(anchor: &Path) -> PathBuf {
    anchor.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn base_dirs(anchor: &Path, paths: Option<&[PathBuf]>) -> Vec<PathBuf> {
    match paths {
        Some(paths) if !paths.is_empty() => paths.to_vec(),
        _ => vec![anchor_dir(anchor)],
    }
}

fn export_subpath(subpath: Option<&str>) -> String {
    match subpath {
        Some(sub) => format!("./{}", sub),
        None => ".".to_string(),
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(ext);
    PathBuf::from(raw)
}

fn load_as_file(path: &Path, extensions: &[&str]) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    extensions
        .iter()
        .map(|ext| append_extension(path, ext))
        .find(|candidate| candidate.is_file())
}

fn load_as_directory(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    if let Some(main) = PackageJson::read(dir).and_then(|pkg| pkg.main) {
        let main_path = dir.join(main);
        let found = load_as_file(&main_path, CLASSIC_EXTENSIONS).or_else(|| {
            main_path
                .is_dir()
                .then(|| load_as_file(&main_path.join("index"), CLASSIC_EXTENSIONS))
                .flatten()
        });
        if found.is_some() {
            return found;
        }
    }
    load_as_file(&dir.join("index"), CLASSIC_EXTENSIONS)
}

fn load_declarative(path: &Path) -> Option<PathBuf> {
    load_as_file(path, DECLARATIVE_EXTENSIONS)
        .or_else(|| load_as_file(&path.join("index"), DECLARATIVE_EXTENSIONS))
}

fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}
