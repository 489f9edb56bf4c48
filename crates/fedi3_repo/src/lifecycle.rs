/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Store lifecycle: path resolution, bootstrap and clean.

use std::fs;
use std::io;

use tracing::{info, warn};

use fedi3_vocab::{Actor, Collection, Item};

use crate::errors::{RepoError, Result};
use crate::repo::{Config, Repo};

/// Resolves the configured storage directory, creating it with mode `0o700`
/// when missing. An empty path selects the in-memory engine and resolves to
/// itself.
pub fn storage_path(c: &Config) -> Result<String> {
    if c.path.is_empty() {
        return Ok(String::new());
    }
    mk_dir_if_not_exists(&c.path)?;
    Ok(c.path.clone())
}

fn mk_dir_if_not_exists(p: &str) -> Result<()> {
    match fs::metadata(p) {
        Ok(meta) => {
            if !meta.is_dir() {
                return Err(RepoError::InvalidArgument(format!(
                    "path exists, and is not a folder {p}"
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(p)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(p, fs::Permissions::from_mode(0o700))?;
            }
            Ok(())
        }
        Err(e) => Err(RepoError::Io(e)),
    }
}

/// Constructs and opens a repository at the configured path, optionally
/// seeding it with the instance `Service` actor and its declared stream
/// collections. Seeding is skipped when the actor is already present, so a
/// second bootstrap leaves the store untouched.
pub fn bootstrap(c: &Config, self_actor: Option<Actor>) -> Result<()> {
    let mut repo = Repo::new(c.clone())?;
    repo.open()?;
    let seeded = seed(&repo, self_actor);
    let closed = repo.close();
    seeded.and(closed)
}

fn seed(repo: &Repo, self_actor: Option<Actor>) -> Result<()> {
    let Some(actor) = self_actor else {
        return Ok(());
    };
    let iri = actor.base.id.clone();
    match repo.load_one(&iri) {
        Ok(_) => {
            info!(iri = %iri, "store already bootstrapped");
            return Ok(());
        }
        Err(RepoError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let saved = repo.create_service(actor)?;
    if let Some(saved) = saved.as_actor() {
        for stream in &saved.streams {
            let col = Collection::ordered(stream.id().clone());
            if let Err(e) = repo.create(&Item::Collection(Box::new(col))) {
                warn!(stream = %stream.id(), error = %e, "unable to create stream collection");
            }
        }
    }
    Ok(())
}

/// Recursively removes the configured storage directory. Succeeds on paths
/// that do not exist.
pub fn clean(c: &Config) -> Result<()> {
    if c.path.is_empty() {
        return Ok(());
    }
    match fs::metadata(&c.path) {
        Ok(meta) if !meta.is_dir() => Err(RepoError::InvalidArgument(format!(
            "path exists, and is not a folder {}",
            c.path
        ))),
        Ok(_) => Ok(fs::remove_dir_all(&c.path)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RepoError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_stays_in_memory() {
        let cfg = Config::default();
        assert_eq!(storage_path(&cfg).expect("path"), "");
    }

    #[test]
    fn creates_missing_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("deep").join("store");
        let cfg = Config {
            path: dir.to_string_lossy().into_owned(),
            cache_enable: false,
        };
        let resolved = storage_path(&cfg).expect("path");
        assert!(fs::metadata(&resolved).expect("created").is_dir());
    }

    #[test]
    fn rejects_non_directory_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("occupied");
        fs::write(&file, b"x").expect("write");
        let cfg = Config {
            path: file.to_string_lossy().into_owned(),
            cache_enable: false,
        };
        assert!(matches!(
            storage_path(&cfg),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(clean(&cfg), Err(RepoError::InvalidArgument(_))));
    }

    #[test]
    fn clean_tolerates_missing_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cfg = Config {
            path: tmp.path().join("never-created").to_string_lossy().into_owned(),
            cache_enable: false,
        };
        clean(&cfg).expect("clean missing path");
    }

    #[test]
    fn clean_removes_a_bootstrapped_store() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cfg = Config {
            path: tmp.path().join("store").to_string_lossy().into_owned(),
            cache_enable: false,
        };
        bootstrap(&cfg, None).expect("bootstrap");
        assert!(fs::metadata(&cfg.path).is_ok());
        clean(&cfg).expect("clean");
        assert!(fs::metadata(&cfg.path).is_err());
    }
}
