//! npmx-core - dependency resolution and tiered execution for the npm
//! package ecosystem
//!
//! npmx-core provides the pieces a package manager and an `npx`-style
//! executor are built from, without owning a filesystem layout of its own:
//!
//! - A hand-rolled SemVer 2.0.0 parser, comparator, and range matcher
//! - `package.json` manifest normalization (deps, `bin`, `exports`, scripts)
//! - An arena-backed LRU cache for registry documents and tarballs
//! - An async registry façade with retrying, single-flight fetch dedup
//! - Breadth-first dependency resolution with backtracking and hoisting
//! - Byte-stable JSON lockfiles
//! - Execution-tier classification (pure ESM / shimmable / native-only)
//! - A tiered CDN-backed orchestrator for ad hoc package execution
//!
//! # Examples
//!
//! ```no_run
//! use npmx_core::{Config, Manifest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let manifest = Manifest::from_json(&serde_json::json!({ "name": "app" }))?;
//! println!("loaded manifest for {}", manifest.name);
//! # let _ = config;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`semver`] - SemVer 2.0.0 parsing, comparison, and range matching
//! - [`manifest`] - Parse and normalize `package.json`
//! - [`cache`] - Arena-backed LRU cache
//! - [`registry`] - Registry façade: transport, retry, caching, dedup
//! - [`resolver`] - Dependency resolution and hoisting
//! - [`lockfile`] - Lockfile generation and parsing
//! - [`classifier`] - Execution-tier classification
//! - [`namespace`] - Tenant namespace validation
//! - [`shell_escape`] - POSIX shell-argument escaping
//! - [`orchestrator`] - Tiered `npx`-style invocation and execution
//! - [`config`] - User and project configuration management
//! - [`error`] - Error types and result handling
//! - [`commands`] - CLI command implementations

pub mod cache;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod lockfile;
pub mod manifest;
pub mod namespace;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod shell_escape;

/// `npmx config` subcommand variants, defined here (rather than in the
/// binary) so [`commands::config::run`] can match on it without the binary
/// crate depending back on the library's CLI wiring.
#[derive(clap::Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. registry.url
        key: String,
        /// New value
        value: String,
    },
}

pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use lockfile::{Lockfile, LockedPackage, LOCKFILE_NAME};
pub use manifest::Manifest;
pub use orchestrator::{Invocation, NpxResult, Orchestrator};
pub use registry::RegistryFacade;
pub use resolver::{hoist, resolve, DependencyNode, ResolveOutput};
pub use semver::{Range, Version};
