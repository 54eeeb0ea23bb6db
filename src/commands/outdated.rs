//! `npmx outdated` - compare the lockfile's pinned versions against each
//! dependency's latest dist-tag on the registry.

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::lockfile::Lockfile;
use crate::registry::{RegistryFacade, ReqwestTransport};

use super::read_manifest;

pub async fn run(config: &Config) -> Result<()> {
    let manifest = read_manifest().context("outdated requires a package.json in this directory")?;
    let Some(lockfile) = Lockfile::load().context("failed to read lockfile")? else {
        println!("No {} found. Run 'npmx install' first.", crate::lockfile::LOCKFILE_NAME);
        return Ok(());
    };

    if manifest.dependencies.is_empty() {
        println!("No dependencies to check.");
        return Ok(());
    }

    let transport = Rc::new(ReqwestTransport::new());
    let registry = RegistryFacade::new(transport, &config.registry, &config.cache);

    let mut rows = Vec::new();
    for (name, range) in &manifest.dependencies {
        let install_path = format!("node_modules/{}", name);
        let Some(current) = lockfile.get_package(&install_path) else {
            eprintln!("warn: '{}' not found in lockfile", name);
            continue;
        };
        let latest = match registry.resolve_tag(name, "latest").await {
            Ok(Some(v)) => v,
            Ok(None) => {
                eprintln!("warn: '{}' has no 'latest' dist-tag", name);
                continue;
            }
            Err(e) => {
                eprintln!("warn: failed to fetch '{}': {}", name, e);
                continue;
            }
        };
        if current.version != latest {
            rows.push((name.clone(), current.version.clone(), latest, range.clone()));
        }
    }

    if rows.is_empty() {
        println!("All packages are up to date.");
        return Ok(());
    }

    println!("{:<24} {:<14} {:<14} {:<14}", "Package", "Current", "Latest", "Range");
    for (name, current, latest, range) in rows {
        println!("{:<24} {:<14} {:<14} {:<14}", name, current, latest, range);
    }
    Ok(())
}
