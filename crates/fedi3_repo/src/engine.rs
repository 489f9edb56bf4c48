/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Thin adapter over the embedded key-value engine.
//!
//! Reads run directly against the tree; writes are staged into a
//! [`sled::Batch`] and applied only when the closure succeeds, so a failed
//! update leaves no partial state. A single writer mutex serializes
//! read-modify-write sections; the engine itself admits concurrent readers.

use std::sync::Mutex;

use tracing::debug;

use crate::errors::{RepoError, Result};

pub(crate) struct Engine {
    db: Option<sled::Db>,
    write: Mutex<()>,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Engine {
            db: None,
            write: Mutex::new(()),
        }
    }

    /// Opens the engine at `path`; an empty path selects the in-memory
    /// backend. Re-opening an already open engine is a no-op.
    pub(crate) fn open(&mut self, path: &str) -> Result<()> {
        if self.db.is_some() {
            return Ok(());
        }
        let config = if path.is_empty() {
            sled::Config::new().temporary(true)
        } else {
            sled::Config::new().path(path)
        };
        let db = config.open()?;
        debug!(path, recovered = db.was_recovered(), "storage engine opened");
        self.db = Some(db);
        Ok(())
    }

    /// Idempotent; tolerates an engine that was never opened.
    pub(crate) fn close(&mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            db.flush()?;
            debug!("storage engine closed");
        }
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        self.db.is_some()
    }

    fn tree(&self) -> Result<&sled::Tree> {
        match &self.db {
            Some(db) => Ok(db),
            None => Err(RepoError::NotOpen),
        }
    }

    /// Read-only closure over the tree.
    pub(crate) fn view<T>(&self, f: impl FnOnce(&sled::Tree) -> Result<T>) -> Result<T> {
        f(self.tree()?)
    }

    /// Read-modify-write closure. The staged batch commits atomically when
    /// `f` returns `Ok` and is discarded otherwise.
    pub(crate) fn update<T>(
        &self,
        f: impl FnOnce(&sled::Tree, &mut sled::Batch) -> Result<T>,
    ) -> Result<T> {
        let tree = self.tree()?;
        let _guard = self.write.lock().unwrap_or_else(|e| e.into_inner());
        let mut batch = sled::Batch::default();
        let out = f(tree, &mut batch)?;
        tree.apply_batch(batch)?;
        Ok(out)
    }
}
