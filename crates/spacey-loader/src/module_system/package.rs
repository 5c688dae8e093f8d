// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! package.json lookup and `exports` map resolution

use serde::Deserialize;
use serde_json::Value as Json;
use std::path::{Path, PathBuf};

/// Minimal package.json structure for resolution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    /// Classic entry point
    #[serde(default)]
    pub main: Option<String>,
    /// `"module"` or `"commonjs"`
    #[serde(rename = "type", default)]
    pub type_field: Option<String>,
    /// Conditional exports map
    #[serde(default)]
    pub exports: Option<Json>,
}

impl PackageJson {
    /// Read `dir/package.json`. Missing or malformed manifests yield `None`.
    pub fn read(dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the package declares itself a declarative (ESM) package
    pub fn is_module(&self) -> bool {
        self.type_field.as_deref() == Some("module")
    }

    /// Resolve `subpath` (`"."` or `"./x"`) through the exports map.
    pub fn resolve_export(&self, dir: &Path, subpath: &str, conditions: &[&str]) -> Option<PathBuf> {
        let target = resolve_exports(self.exports.as_ref()?, subpath, conditions)?;
        let path = dir.join(target.trim_start_matches("./"));
        path.is_file().then_some(path)
    }
}

/// Find the manifest nearest to `file`, walking up from its directory.
///
/// The first package.json found ends the walk, even when it does not parse.
pub fn nearest_package_json(file: &Path) -> Option<PackageJson> {
    let mut current = file.parent();
    while let Some(dir) = current {
        let manifest = dir.join("package.json");
        if manifest.is_file() {
            return PackageJson::read(dir);
        }
        current = dir.parent();
    }
    None
}

/// Resolve a subpath against an `exports` value.
///
/// Supports the string shorthand, subpath maps (including a single `*`
/// wildcard per key), condition objects and fallback arrays. `"default"`
/// always matches.
pub fn resolve_exports(exports: &Json, subpath: &str, conditions: &[&str]) -> Option<String> {
    match exports {
        Json::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            if let Some(target) = map.get(subpath) {
                return resolve_target(target, None, conditions);
            }
            // Longest wildcard prefix wins
            let mut best: Option<(&str, &str, &Json)> = None;
            for (key, target) in map {
                let Some((prefix, suffix)) = key.split_once('*') else {
                    continue;
                };
                if subpath.len() >= prefix.len() + suffix.len()
                    && subpath.starts_with(prefix)
                    && subpath.ends_with(suffix)
                    && best.is_none_or(|(p, _, _)| prefix.len() > p.len())
                {
                    best = Some((prefix, suffix, target));
                }
            }
            let (prefix, suffix, target) = best?;
            let matched = &subpath[prefix.len()..subpath.len() - suffix.len()];
            resolve_target(target, Some(matched), conditions)
        }
        _ if subpath == "." => resolve_target(exports, None, conditions),
        _ => None,
    }
}

fn resolve_target(target: &Json, wildcard: Option<&str>, conditions: &[&str]) -> Option<String> {
    match target {
        Json::String(path) => match wildcard {
            Some(matched) => Some(path.replace('*', matched)),
            None => Some(path.clone()),
        },
        Json::Array(candidates) => candidates
            .iter()
            .find_map(|candidate| resolve_target(candidate, wildcard, conditions)),
        Json::Object(branches) => branches.iter().find_map(|(condition, branch)| {
            if condition == "default" || conditions.contains(&condition.as_str()) {
                resolve_target(branch, wildcard, conditions)
            } else {
                None
            }
        }),
        _ => None,
    }
}

/// Split a bare specifier into package name and optional subpath
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if specifier.starts_with('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = specifier[1..].find('/') {
            let after_scope = &specifier[slash_pos + 2..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
    } else {
        (specifier, None)
    }
}
