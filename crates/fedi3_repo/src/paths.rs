/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Key-space layout on top of the raw byte-oriented engine.
//!
//! An item's prefix is `host/path` derived from its IRI; the encoded blobs
//! hang off literal sub-keys:
//!
//! ```text
//! <host>/<path>/__raw          encoded item
//! <host>/<path>/__items        encoded IRI list (owned collections)
//! <host>/<path>/__meta_data    encoded metadata sidecar
//! oauth/<bucket>/<id>          OAuth records
//! ```

use fedi3_vocab::Iri;

pub(crate) const OBJECT_KEY: &[u8] = b"__raw";
pub(crate) const ITEMS_KEY: &[u8] = b"__items";
pub(crate) const METADATA_KEY: &[u8] = b"__meta_data";
pub(crate) const SEP: u8 = b'/';

pub(crate) const OAUTH_FOLDER: &str = "oauth";
pub(crate) const CLIENTS_BUCKET: &str = "clients";
pub(crate) const AUTHORIZE_BUCKET: &str = "authorize";
pub(crate) const ACCESS_BUCKET: &str = "access";
pub(crate) const REFRESH_BUCKET: &str = "refresh";

/// The top-level buckets whose membership is implicit in the key space.
pub(crate) const STORAGE_ROOTS: [&str; 3] = ["actors", "activities", "objects"];

/// The byte prefix for an IRI; empty when the IRI does not parse.
pub(crate) fn item_path(iri: &Iri) -> Vec<u8> {
    iri.host_path().into_bytes()
}

fn sub_key(prefix: &[u8], leaf: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(prefix.len() + 1 + leaf.len());
    k.extend_from_slice(prefix);
    k.push(SEP);
    k.extend_from_slice(leaf);
    k
}

pub(crate) fn object_key(prefix: &[u8]) -> Vec<u8> {
    sub_key(prefix, OBJECT_KEY)
}

pub(crate) fn items_key(prefix: &[u8]) -> Vec<u8> {
    sub_key(prefix, ITEMS_KEY)
}

pub(crate) fn metadata_key(prefix: &[u8]) -> Vec<u8> {
    sub_key(prefix, METADATA_KEY)
}

pub(crate) fn oauth_key(bucket: &str, id: &str) -> Vec<u8> {
    format!("{OAUTH_FOLDER}/{bucket}/{id}").into_bytes()
}

pub(crate) fn oauth_prefix(bucket: &str) -> Vec<u8> {
    format!("{OAUTH_FOLDER}/{bucket}/").into_bytes()
}

pub(crate) fn is_object_key(k: &[u8]) -> bool {
    k.ends_with(OBJECT_KEY)
}

pub(crate) fn is_items_key(k: &[u8]) -> bool {
    k.ends_with(ITEMS_KEY)
}

fn base_name(p: &[u8]) -> &[u8] {
    match p.iter().rposition(|&b| b == SEP) {
        Some(i) => &p[i + 1..],
        None => p,
    }
}

/// True when the prefix names one of the top-level storage buckets.
pub(crate) fn is_storage_root_key(p: &[u8]) -> bool {
    let base = base_name(p);
    STORAGE_ROOTS.iter().any(|r| r.as_bytes() == base)
}

/// Skips a storage root's own `__raw`/`__items` keys during member
/// iteration, so the bucket descriptor never shows up as a member.
pub(crate) fn is_storage_root_inner_key(k: &[u8]) -> bool {
    let leaf = base_name(k);
    if leaf != OBJECT_KEY && leaf != ITEMS_KEY {
        return false;
    }
    let parent = &k[..k.len().saturating_sub(leaf.len() + 1)];
    is_storage_root_key(parent)
}

/// Counts path separators of `k` relative to `base` after stripping the
/// object-key suffix; true when the count exceeds `depth`. Caps prefix
/// iteration to immediate children or grandchildren.
pub(crate) fn iter_key_too_deep(base: &[u8], k: &[u8], depth: usize) -> bool {
    let mut rest = k;
    if rest.len() > base.len() && rest.starts_with(base) && rest[base.len()] == SEP {
        rest = &rest[base.len() + 1..];
    }
    if rest.ends_with(OBJECT_KEY) {
        rest = &rest[..rest.len() - OBJECT_KEY.len()];
    }
    let cnt = rest.iter().filter(|&&b| b == SEP).count();
    cnt > depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys() {
        let p = item_path(&Iri::new("https://example.com/actors/alice"));
        assert_eq!(p, b"example.com/actors/alice");
        assert_eq!(object_key(&p), b"example.com/actors/alice/__raw");
        assert_eq!(items_key(&p), b"example.com/actors/alice/__items");
        assert_eq!(metadata_key(&p), b"example.com/actors/alice/__meta_data");
    }

    #[test]
    fn unparseable_iri_yields_empty_path() {
        assert!(item_path(&Iri::new("")).is_empty());
        assert!(item_path(&Iri::new("definitely not an iri")).is_empty());
    }

    #[test]
    fn oauth_keys() {
        assert_eq!(oauth_key(CLIENTS_BUCKET, "c1"), b"oauth/clients/c1");
        assert_eq!(oauth_prefix(ACCESS_BUCKET), b"oauth/access/");
    }

    #[test]
    fn suffix_tests() {
        assert!(is_object_key(b"example.com/x/__raw"));
        assert!(!is_object_key(b"example.com/x/__items"));
        assert!(is_items_key(b"example.com/x/__items"));
    }

    #[test]
    fn storage_root_detection() {
        assert!(is_storage_root_key(b"example.com/actors"));
        assert!(is_storage_root_key(b"example.com/objects"));
        assert!(!is_storage_root_key(b"example.com/actors/alice"));

        assert!(is_storage_root_inner_key(b"example.com/actors/__raw"));
        assert!(is_storage_root_inner_key(b"example.com/actors/__items"));
        assert!(!is_storage_root_inner_key(b"example.com/actors/alice/__raw"));
    }

    #[test]
    fn depth_cap() {
        let base = b"example.com/actors";
        assert!(!iter_key_too_deep(base, b"example.com/actors/alice/__raw", 1));
        assert!(iter_key_too_deep(base, b"example.com/actors/alice/inbox/__raw", 1));
        assert!(!iter_key_too_deep(base, b"example.com/actors/alice/inbox/__raw", 2));

        // The collection's own descriptor is never too deep.
        assert!(!iter_key_too_deep(b"example.com/alice/inbox", b"example.com/alice/inbox/__raw", 2));
    }
}
