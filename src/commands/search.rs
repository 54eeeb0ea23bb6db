//! `npmx search` - query the registry's search endpoint.

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::registry::{RegistryFacade, ReqwestTransport};

pub async fn run(query: String, config: &Config) -> Result<()> {
    let transport = Rc::new(ReqwestTransport::new());
    let registry = RegistryFacade::new(transport, &config.registry, &config.cache);

    let results = registry
        .search(&query, 20, 0)
        .await
        .with_context(|| format!("search for '{}' failed", query))?;

    let objects = results
        .get("objects")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    if objects.is_empty() {
        println!("No packages found matching '{}'.", query);
        return Ok(());
    }

    println!("Found {} package(s):", objects.len());
    for entry in &objects {
        let package = entry.get("package").unwrap_or(entry);
        let name = package.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        let version = package.get("version").and_then(|v| v.as_str()).unwrap_or("?");
        match package.get("description").and_then(|v| v.as_str()) {
            Some(desc) => println!("  {}@{} - {}", name, version, desc),
            None => println!("  {}@{}", name, version),
        }
    }
    Ok(())
}
