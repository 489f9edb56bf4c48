/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Bootstrap/clean helper for the object repository.
//!
//! ```text
//! fedi3_repo_ctl bootstrap [path]
//! fedi3_repo_ctl clean [path]
//! ```
//!
//! The storage directory comes from the positional argument or
//! `FEDI3_REPO_PATH`. Exit codes: 0 success, 1 engine failure, 2 path is
//! not a directory, 3 permission denied.

use std::io::ErrorKind;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use fedi3_repo::{bootstrap, clean, Config, RepoError};

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let cmd = args
        .next()
        .context("usage: fedi3_repo_ctl <bootstrap|clean> [path]")?;
    let path = args
        .next()
        .or_else(|| std::env::var("FEDI3_REPO_PATH").ok())
        .unwrap_or_default();

    let cfg = Config {
        path,
        cache_enable: false,
    };

    match cmd.as_str() {
        "bootstrap" => bootstrap(&cfg, None)
            .with_context(|| format!("bootstrap storage at {:?}", cfg.path))?,
        "clean" => {
            clean(&cfg).with_context(|| format!("clean storage at {:?}", cfg.path))?
        }
        other => bail!("unknown command: {other}"),
    }

    info!(path = %cfg.path, command = %cmd, "done");
    Ok(())
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<RepoError>() {
        Some(RepoError::InvalidArgument(_)) => 2,
        Some(RepoError::Io(inner)) if inner.kind() == ErrorKind::PermissionDenied => 3,
        _ => 1,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().expect("valid directive")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("repo ctl failed: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
