//! `npmx uninstall` - drop a dependency from the manifest and re-resolve.

use anyhow::{bail, Context, Result};

use crate::config::Config;

use super::{install, read_manifest};

pub async fn run(package: String, config: &Config) -> Result<()> {
    let mut manifest = read_manifest().context("uninstall requires a package.json in this directory")?;

    let removed = manifest.dependencies.remove(&package).is_some()
        | manifest.dev_dependencies.remove(&package).is_some()
        | manifest.optional_dependencies.remove(&package).is_some();
    if !removed {
        bail!("'{}' is not a dependency of {}", package, manifest.name);
    }

    let path = std::env::current_dir()?.join(super::MANIFEST_NAME);
    std::fs::write(&path, serde_json::to_string_pretty(&manifest)? + "\n")?;
    println!("Removed {} from {}", package, super::MANIFEST_NAME);

    install::resolve_and_lock(&manifest, config).await?;
    Ok(())
}
