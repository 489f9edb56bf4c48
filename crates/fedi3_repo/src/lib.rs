/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Persistent, transactional object repository for ActivityPub vocabulary
//! items, layered over an embedded log-structured key-value engine.
//!
//! The key space holds two disjoint namespaces: the item graph keyed by
//! IRI-derived prefixes (`<host>/<path>/__raw`, `__items`, `__meta_data`)
//! and the OAuth2 credential store under `oauth/`.

pub mod errors;
pub mod lifecycle;
pub mod metadata;
pub mod oauth;
pub mod repo;

mod engine;
mod paths;

pub use errors::{RepoError, Result};
pub use lifecycle::{bootstrap, clean, storage_path};
pub use metadata::{Metadata, PrivateKey};
pub use oauth::{Access, AccessData, Authorize, AuthorizeData, Client, Refresh};
pub use repo::{Config, Repo};
