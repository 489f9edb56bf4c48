/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

/// Errors from vocabulary encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty input handed to the decoder.
    #[error("empty raw item")]
    Empty,

    /// The JSON payload could not be read or written.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A value that must be an object or an IRI string was neither.
    #[error("unexpected json shape: {0}")]
    UnexpectedShape(String),

    /// The IRI does not parse as an absolute URL.
    #[error("invalid iri: {0}")]
    InvalidIri(String),
}

pub type Result<T> = std::result::Result<T, Error>;
