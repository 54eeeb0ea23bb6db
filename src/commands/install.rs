//! `npmx install` - resolve a manifest's dependencies and write a lockfile.

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::lockfile::{self, Lockfile};
use crate::manifest::Manifest;
use crate::registry::{RegistryFacade, ReqwestTransport};
use crate::resolver;

use super::read_manifest;

/// `package` is `Some("name@range")` for `npmx install <pkg>` (added to
/// `dependencies` before resolving); `None` resolves the manifest as-is.
pub async fn run(package: Option<String>, config: &Config) -> Result<()> {
    let mut manifest = read_manifest().context("install requires a package.json in this directory")?;

    if let Some(spec) = package {
        let (name, range) = crate::orchestrator::split_spec(&spec);
        let range = range.unwrap_or_else(|| "*".to_string());
        manifest.dependencies.insert(name.clone(), range.clone());
        println!("Added {}@{} to dependencies", name, range);
        write_manifest(&manifest)?;
    }

    resolve_and_lock(&manifest, config).await
}

pub(super) async fn resolve_and_lock(manifest: &Manifest, config: &Config) -> Result<Lockfile> {
    let transport = Rc::new(ReqwestTransport::new());
    let registry = RegistryFacade::new(transport, &config.registry, &config.cache);

    println!("Resolving dependencies for {}...", manifest.name);
    let output = resolver::resolve(
        &manifest.dependencies,
        &manifest.dev_dependencies,
        &manifest.peer_dependencies,
        &manifest.optional_dependencies,
        &registry,
        &config.resolver,
    )
    .await
    .context("dependency resolution failed")?;

    for warning in &output.warnings {
        println!("warn: {}", warning);
    }

    let lock = lockfile::lock(manifest, &output);
    lock.save().context("failed to write lockfile")?;
    println!(
        "Resolved {} package(s), wrote {}",
        lock.package_count(),
        crate::lockfile::LOCKFILE_NAME
    );
    Ok(lock)
}

fn write_manifest(manifest: &Manifest) -> Result<()> {
    let path = std::env::current_dir()?.join(super::MANIFEST_NAME);
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}
