//! Source dialect detection by file extension.
//!
//! Type-annotated files (`.ts`, `.tsx`, `.mts`, `.cts`) always need
//! conversion before the host can run them. Markup files (`.jsx`, `.tsx`)
//! additionally ask the converter for its markup transform.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches a classic script suffix: `.js`, `.jsx`, `.mjs`, `.cjs`, `.mjsx`, `.cjsx`
static JS_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(c|m)?j(sx?)$").expect("static regex"));

/// Check if a file extension indicates a TypeScript file.
///
/// Returns `true` for `.ts`, `.tsx`, `.mts`, and `.cts` files.
pub fn is_typescript_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "tsx" | "mts" | "cts")
    )
}

/// Check if a file extension indicates a JSX/TSX file.
///
/// Returns `true` for `.jsx` and `.tsx` files.
pub fn is_jsx_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("jsx" | "tsx"))
}

/// Extension of `path` with its leading dot, or an empty string.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Rewrite a classic script suffix to its type-annotated counterpart
/// (`./util.js` -> `./util.ts`, `./view.mjsx` -> `./view.mtsx`).
///
/// Returns `None` when `id` has no classic script suffix.
pub fn typescript_counterpart(id: &str) -> Option<String> {
    if !JS_SUFFIX_RE.is_match(id) {
        return None;
    }
    Some(JS_SUFFIX_RE.replace(id, ".${1}t${2}").into_owned())
}
