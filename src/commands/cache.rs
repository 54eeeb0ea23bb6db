//! `npmx cache` - inspect the in-process registry cache.
//!
//! There is no persistent on-disk store: each invocation of `npmx` runs as a
//! short-lived sandboxed worker, and the metadata/tarball caches live only
//! for the lifetime of a single [`RegistryFacade`]. `cache info` reports the
//! configured capacities; `cache demo` drives one resolve against the
//! current project's manifest so hit/miss counters are visible at all.

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::registry::{RegistryFacade, ReqwestTransport};
use crate::resolver;

use super::read_manifest;

pub fn run_info(config: &Config) -> Result<()> {
    println!("Registry cache configuration");
    println!("  metadata entries: {}", config.cache.metadata_entries);
    println!("  tarball entries:  {}", config.cache.tarball_entries);
    println!();
    println!("Caches are scoped to a single npmx invocation; there is no");
    println!("persistent store across runs in this execution model.");
    Ok(())
}

pub async fn run_demo(config: &Config) -> Result<()> {
    let manifest = read_manifest().context("cache demo requires a package.json in this directory")?;

    let transport = Rc::new(ReqwestTransport::new());
    let registry = RegistryFacade::new(transport, &config.registry, &config.cache);

    let resolve_once = || {
        resolver::resolve(
            &manifest.dependencies,
            &manifest.dev_dependencies,
            &manifest.peer_dependencies,
            &manifest.optional_dependencies,
            &registry,
            &config.resolver,
        )
    };

    let output = resolve_once().await.context("resolve failed")?;
    println!("Resolved {} package(s).", output.nodes.len());

    // Second pass over the same manifest reuses the still-warm facade, so any
    // package touched twice (shared transitive deps) now shows as a hit.
    let output = resolve_once().await.context("resolve failed")?;
    println!("Re-resolved {} package(s) against the warm cache.", output.nodes.len());

    let meta = registry.metadata_cache_stats();
    let tarball = registry.tarball_cache_stats();
    println!();
    println!("{:<12} {:>6} {:>6} {:>10} {:>8}", "cache", "hits", "misses", "evictions", "hit rate");
    println!(
        "{:<12} {:>6} {:>6} {:>10} {:>7.1}%",
        "metadata", meta.hits, meta.misses, meta.evictions, meta.hit_rate() * 100.0
    );
    println!(
        "{:<12} {:>6} {:>6} {:>10} {:>7.1}%",
        "tarball", tarball.hits, tarball.misses, tarball.evictions, tarball.hit_rate() * 100.0
    );
    Ok(())
}
