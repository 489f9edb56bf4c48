/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// An Internationalized Resource Identifier, the stable identity of every
/// stored item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(s: impl Into<String>) -> Self {
        Iri(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the IRI as an absolute URL.
    pub fn url(&self) -> Result<url::Url> {
        url::Url::parse(&self.0).map_err(|_| Error::InvalidIri(self.0.clone()))
    }

    /// `host || "/" || path` with separators normalized and no trailing
    /// slash. Empty when the IRI does not parse.
    pub fn host_path(&self) -> String {
        let Ok(u) = self.url() else {
            return String::new();
        };
        let host = u.host_str().unwrap_or_default();
        let path = u.path().trim_matches('/');
        if path.is_empty() {
            return host.to_string();
        }
        let mut out = String::with_capacity(host.len() + path.len() + 1);
        out.push_str(host);
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            out.push('/');
            out.push_str(seg);
        }
        out
    }

    /// Link equality. With `check_fragment` false the `#fragment` part of
    /// both sides is ignored; this is the equality used for collection
    /// membership.
    pub fn equals(&self, other: &Iri, check_fragment: bool) -> bool {
        if check_fragment {
            return self.0 == other.0;
        }
        strip_fragment(&self.0) == strip_fragment(&other.0)
    }

    /// Appends a path segment.
    pub fn join(&self, segment: &str) -> Iri {
        let base = self.0.trim_end_matches('/');
        Iri(format!("{base}/{segment}"))
    }

    /// The last path segment, if any.
    pub fn base_name(&self) -> &str {
        strip_fragment(&self.0)
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Splits `<owner>/<collection>` when the last segment names a known
    /// owned collection.
    pub fn split_collection(&self) -> Option<(Iri, &str)> {
        let trimmed = strip_fragment(&self.0).trim_end_matches('/');
        let (owner, name) = trimmed.rsplit_once('/')?;
        if !crate::collections::is_owned_collection(name) {
            return None;
        }
        Some((Iri(owner.to_string()), name))
    }

    pub fn with_fragment(&self, fragment: &str) -> Iri {
        Iri(format!("{}#{fragment}", strip_fragment(&self.0)))
    }
}

fn strip_fragment(s: &str) -> &str {
    match s.split_once('#') {
        Some((head, _)) => head,
        None => s,
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Iri(s.to_string())
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Iri(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_path_normalizes() {
        assert_eq!(Iri::new("https://example.com").host_path(), "example.com");
        assert_eq!(
            Iri::new("https://example.com/actors/alice").host_path(),
            "example.com/actors/alice"
        );
        assert_eq!(
            Iri::new("https://example.com//actors//alice/").host_path(),
            "example.com/actors/alice"
        );
    }

    #[test]
    fn host_path_empty_for_garbage() {
        assert_eq!(Iri::new("").host_path(), "");
        assert_eq!(Iri::new("not an iri").host_path(), "");
    }

    #[test]
    fn fragment_insensitive_equality() {
        let a = Iri::new("https://example.com/alice#main");
        let b = Iri::new("https://example.com/alice");
        assert!(a.equals(&b, false));
        assert!(!a.equals(&b, true));
    }

    #[test]
    fn split_collection_recognizes_owned_names() {
        let iri = Iri::new("https://example.com/alice/inbox");
        let (owner, name) = iri.split_collection().expect("should split");
        assert_eq!(owner.as_str(), "https://example.com/alice");
        assert_eq!(name, "inbox");

        assert!(Iri::new("https://example.com/alice").split_collection().is_none());
    }

    #[test]
    fn join_and_base_name() {
        let iri = Iri::new("https://example.com/alice");
        assert_eq!(iri.join("outbox").as_str(), "https://example.com/alice/outbox");
        assert_eq!(iri.join("outbox").base_name(), "outbox");
    }
}
