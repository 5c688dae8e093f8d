// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Content-addressed conversion cache
//!
//! One file per source path. The entry ends with a trailer comment
//! `/* v{version}-{fingerprint} */`; an entry is reused only when its trailer
//! matches the current version and the current source's fingerprint.

use crate::error::LoaderError;
use crate::hash::{md5_hex, PATH_HASH_LEN, SOURCE_HASH_LEN};
use crate::logging::trace_load;
use crate::transform::is_sentinel;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Disk cache of converted code
#[derive(Debug, Clone)]
pub struct TransformCache {
    dir: Option<PathBuf>,
    version: String,
    debug: bool,
}

impl TransformCache {
    /// Open the cache in `dir`.
    ///
    /// The directory is created if missing. When it cannot be created or
    /// written, caching is disabled for the lifetime of this cache.
    pub fn open(dir: Option<PathBuf>, version: impl Into<String>, debug: bool) -> Self {
        let dir = dir.and_then(|dir| match probe_writable(&dir) {
            Ok(()) => Some(dir),
            Err(source) => {
                let err = LoaderError::CacheIo {
                    path: dir.clone(),
                    source,
                };
                warn!("conversion cache disabled: {}", err);
                None
            }
        });
        Self {
            dir,
            version: version.into(),
            debug,
        }
    }

    /// A cache that never stores anything
    pub fn disabled(version: impl Into<String>, debug: bool) -> Self {
        Self::open(None, version, debug)
    }

    /// Cache directory, when enabled
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Whether entries are read and written
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Cache version baked into trailers
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Entry path for `filename`: `{parent}-{base}.{hash}.js`
    pub fn entry_path(&self, filename: &Path) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(entry_name(filename)))
    }

    /// Trailer appended to the entry for `source`
    pub fn trailer(&self, source: &str) -> String {
        format!(" /* v{}-{} */", self.version, md5_hex(source, SOURCE_HASH_LEN))
    }

    /// Converted code for `filename`, reusing a valid entry or calling
    /// `compute` and storing its output.
    ///
    /// Output carrying a sentinel error is never stored. Write failures are
    /// logged and otherwise ignored.
    pub fn get(&self, filename: &Path, source: &str, compute: impl FnOnce() -> String) -> String {
        let Some(entry) = self.entry_path(filename) else {
            return compute();
        };
        let trailer = self.trailer(source);

        if let Ok(cached) = fs::read_to_string(&entry) {
            if let Some(code) = cached.strip_suffix(&trailer) {
                trace_load!(self, "[cache hit] {} ~> {}", filename.display(), entry.display());
                return code.to_string();
            }
        }

        let code = compute();
        if !is_sentinel(&code) {
            if let Err(source) = write_atomic(&entry, &code, &trailer) {
                let err = LoaderError::CacheIo {
                    path: entry.clone(),
                    source,
                };
                warn!("{}", err);
            }
        }
        code
    }
}

fn entry_name(filename: &Path) -> String {
    let parent = filename
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = filename
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let hash = md5_hex(&filename.to_string_lossy(), PATH_HASH_LEN);
    format!("{}-{}.{}.js", parent, base, hash)
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    NamedTempFile::new_in(dir).map(drop)
}

fn write_atomic(entry: &Path, code: &str, trailer: &str) -> std::io::Result<()> {
    let dir = entry.parent().unwrap_or(Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(code.as_bytes())?;
    file.write_all(trailer.as_bytes())?;
    file.persist(entry).map_err(|e| e.error)?;
    Ok(())
}
