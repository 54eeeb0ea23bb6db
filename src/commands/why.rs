//! `npmx why` - explain why a package appears in the resolved tree.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Context, Result};

use crate::lockfile::Lockfile;

use super::read_manifest;

pub fn run(package: String) -> Result<()> {
    let manifest = read_manifest().context("why requires a package.json in this directory")?;
    let Some(lockfile) = Lockfile::load().context("failed to read lockfile")? else {
        println!("No {} found. Run 'npmx install' first.", crate::lockfile::LOCKFILE_NAME);
        return Ok(());
    };

    let by_name: HashMap<&str, &str> = lockfile
        .packages
        .iter()
        .filter(|(path, _)| !path.is_empty())
        .filter_map(|(path, _)| path.rsplit('/').next().map(|name| (name, path.as_str())))
        .collect();

    let Some(target_path) = by_name.get(package.as_str()) else {
        println!("'{}' is not installed.", package);
        return Ok(());
    };
    let target_version = &lockfile.get_package(target_path).unwrap().version;

    if let Some(constraint) = manifest.dependencies.get(&package) {
        println!("{}@{} is a direct dependency ({})", package, target_version, constraint);
        return Ok(());
    }

    let mut chains = Vec::new();
    for (direct_name, range) in &manifest.dependencies {
        if direct_name == &package {
            continue;
        }
        let Some(direct_path) = by_name.get(direct_name.as_str()) else {
            continue;
        };
        for chain in find_chains(direct_path, target_path, &lockfile) {
            chains.push((direct_name.clone(), range.clone(), chain));
        }
    }

    if chains.is_empty() {
        println!("Could not find a dependency chain leading to '{}'.", package);
        println!("It may be installed under a conflict-nested path not reachable from a direct dependency.");
        return Ok(());
    }

    println!("{}@{} is required by:", package, target_version);
    for (idx, (root_name, root_range, chain)) in chains.iter().enumerate() {
        println!("  chain #{}:", idx + 1);
        println!("    {} ({}, direct)", root_name, root_range);
        for path in chain {
            let version = lockfile.get_package(path).map(|p| p.version.as_str()).unwrap_or("?");
            let name = path.rsplit('/').next().unwrap_or(path.as_str());
            println!("    -> {}@{}", name, version);
        }
    }
    Ok(())
}

/// BFS over install paths from `start` to `target`, returning every shortest
/// chain of intermediate (not including `start`) install paths found.
fn find_chains(start: &str, target: &str, lockfile: &Lockfile) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back((start.to_string(), Vec::<String>::new()));
    let mut visited = HashSet::new();
    visited.insert(start.to_string());

    while let Some((current, chain)) = queue.pop_front() {
        let Some(package) = lockfile.get_package(&current) else {
            continue;
        };
        let Some(deps) = &package.dependencies else {
            continue;
        };
        for dep_name in deps.keys() {
            let dep_path = format!("node_modules/{}", dep_name);
            let dep_path = if lockfile.get_package(&dep_path).is_some() {
                dep_path
            } else {
                continue;
            };
            let mut next_chain = chain.clone();
            next_chain.push(dep_path.clone());
            if dep_path == target {
                paths.push(next_chain);
            } else if visited.insert(dep_path.clone()) {
                queue.push_back((dep_path, next_chain));
            }
        }
    }
    paths
}
