//! User and project configuration management.
//!
//! Configuration is layered: a user-level file at `~/.npmx/config.toml`,
//! overridable by a project-local `.npmxrc.toml` in the current directory,
//! overridable in turn by a handful of environment variables. Configuration
//! is TOML; documents that cross the registry wire (manifest, lockfile) stay
//! JSON.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_cdn_url() -> String {
    "https://esm.sh".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    200
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            cdn_url: default_cdn_url(),
            retry_attempts: default_retry_attempts(),
            retry_base_ms: default_retry_base_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_metadata_cache_size")]
    pub metadata_entries: usize,
    #[serde(default = "default_tarball_cache_size")]
    pub tarball_entries: usize,
}

fn default_metadata_cache_size() -> usize {
    512
}

fn default_tarball_cache_size() -> usize {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata_entries: default_metadata_cache_size(),
            tarball_entries: default_tarball_cache_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub include_peer: bool,
    #[serde(default = "default_true")]
    pub include_dev: bool,
    #[serde(default = "default_true")]
    pub include_optional: bool,
    #[serde(default)]
    pub prefer_latest: bool,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub include_prerelease: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            include_peer: false,
            include_dev: true,
            include_optional: true,
            prefer_latest: false,
            strict: false,
            include_prerelease: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_exec_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_exec_timeout_ms() -> u64 {
    30_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_exec_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            cache: CacheConfig::default(),
            resolver: ResolverConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl Config {
    /// `~/.npmx/config.toml`, or `$NPMX_CONFIG_DIR/config.toml` when set
    /// (used by tests to avoid touching the real home directory).
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("NPMX_CONFIG_DIR") {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Validation("could not determine home directory".to_string()))?;
        Ok(home.join(".npmx").join("config.toml"))
    }

    /// Project-local override, checked in the current directory.
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".npmxrc.toml")
    }

    /// Loads the user config, merges a project-local override if present,
    /// then applies environment variable overrides. Missing files are not
    /// an error — defaults apply.
    pub fn load() -> Result<Self> {
        let mut config = Self::read_layer(&Self::user_config_path()?)?.unwrap_or_default();
        if let Some(project) = Self::read_layer(&Self::project_config_path())? {
            config.merge(project);
        }
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_layer(path: &PathBuf) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// A present `.npmxrc.toml` replaces the whole layer below it rather
    /// than merging field-by-field; any section it omits falls back to
    /// `Default`, not to the user-level value.
    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("NPMX_REGISTRY") {
            if !url.is_empty() {
                self.registry.url = url;
            }
        }
        if let Ok(url) = std::env::var("NPMX_CDN") {
            if !url.is_empty() {
                self.registry.cdn_url = url;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_registry_and_cache_sizes() {
        let config = Config::default();
        assert_eq!(config.registry.url, "https://registry.npmjs.org");
        assert!(config.cache.metadata_entries > 0);
        assert!(config.cache.tarball_entries > 0);
    }

    #[test]
    fn resolver_defaults_match_npm_conventions() {
        let config = ResolverConfig::default();
        assert!(!config.include_peer);
        assert!(config.include_dev);
        assert!(config.include_optional);
        assert!(!config.include_prerelease);
    }
}
