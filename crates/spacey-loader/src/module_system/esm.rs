// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ECMAScript module detection
//!
//! Decides whether a file follows the declarative `import`/`export`
//! convention, from its extension, the nearest package.json `"type"` field,
//! or a static scan of its source.

use crate::module_system::package::nearest_package_json;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static ESM_SYNTAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:[\s;]|^)(?:import[\s\w*,{}]*from|import\s*["'*{]|export\b\s*(?:[*{]|default|class|type|function|const|var|let|async function)|import\.meta\b)"#,
    )
    .expect("static regex")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n\r]*").expect("static regex"));

/// Whether `path` is a native declarative module: `.mjs`, or `.js` inside a
/// package whose nearest package.json says `"type": "module"`.
pub fn is_native_esm(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mjs") => true,
        Some("js") => nearest_package_json(path).is_some_and(|pkg| pkg.is_module()),
        _ => false,
    }
}

/// Static scan for `import`/`export` syntax, ignoring comments.
pub fn has_esm_syntax(source: &str) -> bool {
    ESM_SYNTAX_RE.is_match(&COMMENT_RE.replace_all(source, ""))
}
