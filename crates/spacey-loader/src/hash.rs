// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Content fingerprints for cache keys

use md5::{Digest, Md5};

/// Hex length of path hashes in cache filenames
pub const PATH_HASH_LEN: usize = 8;

/// Hex length of source fingerprints in cache trailers
pub const SOURCE_HASH_LEN: usize = 16;

/// MD5 of `content` as lowercase hex, truncated to `len` characters.
pub fn md5_hex(content: &str, len: usize) -> String {
    let digest = Md5::digest(content.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(len);
    hex
}

/// Stable hash of conversion engine options, used to salt the cache version.
///
/// `serde_json` keeps object keys in insertion order, so callers that build
/// the same options in the same order always get the same salt.
pub fn hash_options(options: &serde_json::Value) -> String {
    md5_hex(&options.to_string(), PATH_HASH_LEN)
}
