//! `npmx list` - print the resolved package set from the lockfile.

use anyhow::{Context, Result};

use crate::lockfile::Lockfile;

pub fn run() -> Result<()> {
    let lockfile = Lockfile::load().context("failed to read lockfile")?;
    let Some(lockfile) = lockfile else {
        println!("No {} found. Run 'npmx install' first.", crate::lockfile::LOCKFILE_NAME);
        return Ok(());
    };

    if lockfile.package_count() == 0 {
        println!("No packages installed.");
        return Ok(());
    }

    println!("{}@{}", lockfile.name, lockfile.version);
    for (path, package) in &lockfile.packages {
        if path.is_empty() {
            continue;
        }
        let mut flags = Vec::new();
        if package.dev {
            flags.push("dev");
        }
        if package.optional {
            flags.push("optional");
        }
        if package.peer {
            flags.push("peer");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!("  {} {}{}", path, package.version, suffix);
    }
    println!("Total: {} package(s)", lockfile.package_count());
    Ok(())
}
