//! `npmx config` - show or set layered configuration values.

use anyhow::{bail, Result};

use crate::config::Config;

pub fn run(action: &crate::ConfigAction) -> Result<()> {
    match action {
        crate::ConfigAction::Show => show(),
        crate::ConfigAction::Set { key, value } => set(key, value),
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    println!("Config file: {}", Config::user_config_path()?.display());
    println!();
    println!("registry.url              = {}", config.registry.url);
    println!("registry.cdn_url          = {}", config.registry.cdn_url);
    println!("registry.retry_attempts   = {}", config.registry.retry_attempts);
    println!("registry.retry_base_ms    = {}", config.registry.retry_base_ms);
    println!("registry.timeout_ms       = {}", config.registry.timeout_ms);
    println!("cache.metadata_entries    = {}", config.cache.metadata_entries);
    println!("cache.tarball_entries     = {}", config.cache.tarball_entries);
    println!("resolver.include_peer     = {}", config.resolver.include_peer);
    println!("resolver.include_dev      = {}", config.resolver.include_dev);
    println!("resolver.include_optional = {}", config.resolver.include_optional);
    println!("resolver.prefer_latest    = {}", config.resolver.prefer_latest);
    println!("resolver.strict           = {}", config.resolver.strict);
    println!("resolver.include_prerelease = {}", config.resolver.include_prerelease);
    println!("orchestrator.timeout_ms   = {}", config.orchestrator.timeout_ms);
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    macro_rules! parse_bool {
        () => {
            value
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("'{}' is not a boolean (use true/false)", value))?
        };
    }
    macro_rules! parse_num {
        ($ty:ty) => {
            value
                .parse::<$ty>()
                .map_err(|_| anyhow::anyhow!("'{}' is not a valid number", value))?
        };
    }

    match key {
        "registry.url" => config.registry.url = value.to_string(),
        "registry.cdn_url" => config.registry.cdn_url = value.to_string(),
        "registry.retry_attempts" => config.registry.retry_attempts = parse_num!(u32),
        "registry.retry_base_ms" => config.registry.retry_base_ms = parse_num!(u64),
        "registry.timeout_ms" => config.registry.timeout_ms = parse_num!(u64),
        "cache.metadata_entries" => config.cache.metadata_entries = parse_num!(usize),
        "cache.tarball_entries" => config.cache.tarball_entries = parse_num!(usize),
        "resolver.include_peer" => config.resolver.include_peer = parse_bool!(),
        "resolver.include_dev" => config.resolver.include_dev = parse_bool!(),
        "resolver.include_optional" => config.resolver.include_optional = parse_bool!(),
        "resolver.prefer_latest" => config.resolver.prefer_latest = parse_bool!(),
        "resolver.strict" => config.resolver.strict = parse_bool!(),
        "resolver.include_prerelease" => config.resolver.include_prerelease = parse_bool!(),
        "orchestrator.timeout_ms" => config.orchestrator.timeout_ms = parse_num!(u64),
        other => bail!("unknown configuration key '{}'", other),
    }

    config.save()?;
    println!("{} = {}", key, value);
    Ok(())
}
