// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path alias table
//!
//! Aliases are prefix rewrites applied to a request id before resolution:
//!
//! ```text
//! { "@app/": "./src/" }   "@app/util" -> "./src/util"
//! { "fs": "memfs" }       "fs/promises" -> "memfs/promises"
//! ```
//!
//! The table is normalized once: entries are ordered from most to least
//! specific (by path segment count) and targets that themselves start with
//! another alias are expanded.

use indexmap::IndexMap;

/// Normalized, ordered alias table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    /// Build and normalize a table. Returns `None` for an empty mapping.
    pub fn new(aliases: &IndexMap<String, String>) -> Option<Self> {
        if aliases.is_empty() {
            return None;
        }

        let mut entries: Vec<(String, String)> = aliases
            .iter()
            .map(|(from, to)| (normalize_separators(from), normalize_separators(to)))
            .collect();
        // Stable sort keeps caller order among equally specific aliases
        entries.sort_by(|(a, _), (b, _)| segment_count(b).cmp(&segment_count(a)));

        for i in 0..entries.len() {
            for j in 0..entries.len() {
                let (key, alias) = (&entries[i].0, &entries[j].0);
                if i == j || key.starts_with(alias.as_str()) {
                    continue;
                }
                let target = &entries[i].1;
                if target.starts_with(alias.as_str())
                    && is_separator(target[alias.len()..].chars().next())
                {
                    let expanded = format!("{}{}", entries[j].1, &target[alias.len()..]);
                    entries[i].1 = expanded;
                }
            }
        }

        Some(Self { entries })
    }

    /// Rewrite `id` with the first matching alias, or return it unchanged.
    pub fn resolve(&self, id: &str) -> String {
        let id = normalize_separators(id);
        for (alias, to) in &self.entries {
            if !id.starts_with(alias.as_str()) {
                continue;
            }
            let bare = alias.strip_suffix('/').unwrap_or(alias);
            let next = id[bare.len()..].chars().next();
            if next.is_none() || next == Some('/') {
                return join(to, &id[alias.len().min(id.len())..]);
            }
        }
        id
    }

    /// Normalized entries in match order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn segment_count(path: &str) -> usize {
    path.split('/').count()
}

fn is_separator(c: Option<char>) -> bool {
    matches!(c, None | Some('/'))
}

fn join(base: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), rest)
}
