/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! ActivityStreams vocabulary for the FEDI3 object repository.
//!
//! Items are modelled as a tagged sum over the handful of shapes the store
//! cares about: bare IRI links, plain objects, actors, (intransitive)
//! activities, collections and tombstones. Every shape keeps the JSON-LD
//! fields it does not recognize in an `extra` map so that encode/decode
//! round-trips foreign vocabulary untouched.

pub mod checks;
pub mod codec;
pub mod collections;
pub mod error;
pub mod iri;
pub mod item;

pub use checks::Check;
pub use codec::{decode_iri_list, decode_item, encode_iri_list, encode_item};
pub use error::{Error, Result};
pub use iri::Iri;
pub use item::{
    truncate_to_seconds, Activity, Actor, Collection, Item, Object, PublicKey, Tombstone,
};

/// The ActivityStreams public addressing namespace.
pub const PUBLIC_NS: &str = "https://www.w3.org/ns/activitystreams#Public";
