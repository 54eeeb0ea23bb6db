//! `npmx update` - re-resolve against the newest versions satisfying each
//! range and report what moved relative to the existing lockfile.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::lockfile::Lockfile;

use super::{install, read_manifest};

pub async fn run(config: &Config) -> Result<()> {
    let manifest = read_manifest().context("update requires a package.json in this directory")?;
    let previous = Lockfile::load().context("failed to read existing lockfile")?;

    let mut config = config.clone();
    config.resolver.prefer_latest = true;

    let updated = install::resolve_and_lock(&manifest, &config).await?;

    match previous {
        Some(previous) => report_diff(&previous, &updated),
        None => println!("No previous lockfile to compare against."),
    }
    Ok(())
}

fn report_diff(previous: &Lockfile, updated: &Lockfile) {
    let mut changed = 0;
    for (path, package) in &updated.packages {
        if path.is_empty() {
            continue;
        }
        match previous.get_package(path) {
            Some(old) if old.version != package.version => {
                println!("  {} {} -> {}", path, old.version, package.version);
                changed += 1;
            }
            None => {
                println!("  {} added at {}", path, package.version);
                changed += 1;
            }
            _ => {}
        }
    }
    for path in previous.packages.keys() {
        if !path.is_empty() && !updated.packages.contains_key(path) {
            println!("  {} removed", path);
            changed += 1;
        }
    }
    if changed == 0 {
        println!("Already up to date.");
    } else {
        println!("{} package(s) changed.", changed);
    }
}
