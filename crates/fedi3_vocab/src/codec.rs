/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Canonical byte forms for items and IRI lists.
//!
//! The encoder emits compact JSON with sorted unknown-field maps, so equal
//! values always produce equal bytes. The decoder accepts any
//! whitespace-insensitive JSON-LD shape.

use crate::error::{Error, Result};
use crate::iri::Iri;
use crate::item::Item;

pub fn encode_item(it: &Item) -> Result<Vec<u8>> {
    let v = it.to_value()?;
    Ok(serde_json::to_vec(&v)?)
}

pub fn decode_item(raw: &[u8]) -> Result<Item> {
    if raw.is_empty() {
        return Err(Error::Empty);
    }
    let v: serde_json::Value = serde_json::from_slice(raw)?;
    Item::from_value(v)
}

pub fn encode_iri_list(list: &[Iri]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(list)?)
}

pub fn decode_iri_list(raw: &[u8]) -> Result<Vec<Iri>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(raw)?)
}
