/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{DateTime, Utc};

/// Errors from repository operations. Each kind carries a short, stable
/// message that callers can match on.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Operation invoked while the engine is closed.
    #[error("storage is not open")]
    NotOpen,

    /// Key absent; the message names the key path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Nil input where non-nil is required, bare IRI where an item is
    /// required, empty password.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Password mismatch.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// OAuth record past its `created_at + expires_in`.
    #[error("expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    /// Wraps transient engine failures.
    #[error("engine error: {0}")]
    Engine(#[from] sled::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepoError {
    pub(crate) fn not_found(key: impl AsRef<[u8]>) -> Self {
        RepoError::NotFound(String::from_utf8_lossy(key.as_ref()).into_owned())
    }

    pub(crate) fn decode(e: impl std::fmt::Display) -> Self {
        RepoError::Decode(e.to_string())
    }

    pub(crate) fn encode(e: impl std::fmt::Display) -> Self {
        RepoError::Encode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
