//! CLI command implementations, one module per subcommand. Each function
//! here is the thin imperative shell around the library: it reads the
//! on-disk manifest/lockfile, calls into `crate::{resolver, lockfile,
//! registry, orchestrator, classifier}`, and prints a human-readable
//! report. Library errors are widened to `anyhow::Error` with `Context` at
//! this boundary; the library itself stays on its own tagged `Error` type.

pub mod cache;
pub mod config;
pub mod init;
pub mod install;
pub mod list;
pub mod outdated;
pub mod run;
pub mod search;
pub mod tree;
pub mod uninstall;
pub mod update;
pub mod why;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::manifest::Manifest;

pub const MANIFEST_NAME: &str = "package.json";

/// Reads and normalizes `package.json` from the current directory.
pub fn read_manifest() -> Result<Manifest> {
    read_manifest_from(env::current_dir()?.join(MANIFEST_NAME))
}

pub fn read_manifest_from(path: PathBuf) -> Result<Manifest> {
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("no {} in {}", MANIFEST_NAME, path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(Manifest::from_json(&value)?)
}

pub fn manifest_exists() -> bool {
    env::current_dir()
        .map(|d| d.join(MANIFEST_NAME).exists())
        .unwrap_or(false)
}
