//! `npmx tree` - print the resolved dependency tree from the lockfile.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};

use crate::lockfile::Lockfile;

use super::read_manifest;

pub fn run() -> Result<()> {
    let manifest = read_manifest().context("tree requires a package.json in this directory")?;
    let Some(lockfile) = Lockfile::load().context("failed to read lockfile")? else {
        println!("No {} found. Run 'npmx install' first.", crate::lockfile::LOCKFILE_NAME);
        return Ok(());
    };

    if manifest.dependencies.is_empty() {
        println!("No dependencies to display.");
        return Ok(());
    }

    // Root-level install paths only; nested conflict copies are reached
    // by walking `dependencies`, not by a second top-level lookup.
    let by_name: HashMap<&str, &str> = lockfile
        .packages
        .iter()
        .filter(|(path, _)| !path.is_empty())
        .filter_map(|(path, _)| {
            path.rsplit('/').next().map(|name| (name, path.as_str()))
        })
        .collect();

    println!("{}@{}", lockfile.name, lockfile.version);
    let mut visited = HashSet::new();
    let entries: Vec<_> = manifest.dependencies.iter().collect();
    for (i, (name, range)) in entries.iter().enumerate() {
        let is_last = i + 1 == entries.len();
        match by_name.get(name.as_str()) {
            Some(path) => print_node(name, range, path, &lockfile, &by_name, 0, is_last, &mut visited),
            None => println!("└── {} (not installed)", name),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn print_node(
    name: &str,
    range: &str,
    install_path: &str,
    lockfile: &Lockfile,
    by_name: &HashMap<&str, &str>,
    depth: usize,
    is_last: bool,
    visited: &mut HashSet<String>,
) {
    let prefix = if depth == 0 {
        String::new()
    } else {
        let mut p = "│   ".repeat(depth.saturating_sub(1));
        p.push_str(if is_last { "└── " } else { "├── " });
        p
    };

    let Some(package) = lockfile.get_package(install_path) else {
        println!("{}{} (missing from lockfile)", prefix, name);
        return;
    };

    let label = if depth == 0 {
        format!("{}@{} ({})", name, package.version, range)
    } else {
        format!("{}@{}", name, package.version)
    };

    if visited.contains(install_path) {
        println!("{}{} (already shown)", prefix, label);
        return;
    }
    visited.insert(install_path.to_string());
    println!("{}{}", prefix, label);

    let Some(deps) = &package.dependencies else {
        return;
    };
    let children: Vec<_> = deps.iter().collect();
    for (i, (dep_name, dep_range)) in children.iter().enumerate() {
        let is_last_child = i + 1 == children.len();
        match by_name.get(dep_name.as_str()) {
            Some(child_path) => print_node(
                dep_name,
                dep_range,
                child_path,
                lockfile,
                by_name,
                depth + 1,
                is_last_child,
                visited,
            ),
            None => println!(
                "{}{}{} (not installed)",
                "│   ".repeat(depth),
                if is_last_child { "└── " } else { "├── " },
                dep_name
            ),
        }
    }
}
