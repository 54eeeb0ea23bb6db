//! Lockfile generation and parsing.
//!
//! JSON, keyed by install path. A `BTreeMap<String, _>` field serialized
//! through `serde_json` guarantees sorted-key, byte-stable output across
//! repeated resolves of the same input without any extra bookkeeping.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::resolver::{DependencyNode, ResolveOutput};

pub const LOCKFILE_NAME: &str = "npmx-lock.json";
pub const LOCKFILE_VERSION: u32 = 3;

/// `{ lockfileVersion, name, version, packages }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    #[serde(rename = "lockfileVersion")]
    pub lockfile_version: u32,
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub packages: BTreeMap<String, LockedPackage>,
}

/// One entry in `packages`. `dependencies` and the edge-kind flags are
/// omitted entirely when empty/false via `skip_serializing_if`, keeping
/// lockfiles for simple dependency trees short.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedPackage {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dev: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub peer: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Lockfile {
    /// Builds the lockfile document from a root manifest and an already
    /// hoisted node set ([`crate::resolver::hoist`]'s output): the root
    /// occupies the `""` install-path, every other entry the path hoisting
    /// assigned it.
    pub fn build(manifest: &Manifest, hoisted: &BTreeMap<String, Rc<DependencyNode>>) -> Self {
        let mut packages = BTreeMap::new();
        packages.insert(
            String::new(),
            LockedPackage {
                version: manifest.version.clone().unwrap_or_default(),
                resolved: None,
                integrity: None,
                dependencies: if manifest.dependencies.is_empty() {
                    None
                } else {
                    Some(manifest.dependencies.clone())
                },
                dev: false,
                optional: false,
                peer: false,
            },
        );
        for (path, node) in hoisted {
            packages.insert(
                path.clone(),
                LockedPackage {
                    version: node.version.to_string(),
                    resolved: Some(node.resolved_url.clone()),
                    integrity: node.integrity.clone(),
                    dependencies: if node.dependencies.is_empty() {
                        None
                    } else {
                        Some(node.dependencies.clone())
                    },
                    dev: node.edge_kinds.dev,
                    optional: node.edge_kinds.optional,
                    peer: node.edge_kinds.peer,
                },
            );
        }
        Lockfile {
            lockfile_version: LOCKFILE_VERSION,
            name: manifest.name.clone(),
            version: manifest.version.clone().unwrap_or_default(),
            packages,
        }
    }

    /// Byte-stable serialization: `BTreeMap` keys are already sorted, so
    /// two resolves over the same input produce identical bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Parse(format!("malformed lockfile: {}", e)))
    }

    pub fn load() -> Result<Option<Self>> {
        Self::load_from(LOCKFILE_NAME)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::parse(&fs::read(path)?).map(Some)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(LOCKFILE_NAME)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.serialize()?)?;
        Ok(())
    }

    pub fn package_count(&self) -> usize {
        self.packages.len().saturating_sub(1) // exclude the root entry
    }

    pub fn get_package(&self, install_path: &str) -> Option<&LockedPackage> {
        self.packages.get(install_path)
    }
}

/// Convenience: hoist `output` and build the lockfile in one call.
pub fn lock(manifest: &Manifest, output: &ResolveOutput) -> Lockfile {
    let hoisted = crate::resolver::hoist(output);
    Lockfile::build(manifest, &hoisted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::EdgeKinds;
    use crate::semver::Version;
    use serde_json::json;

    fn node(name: &str, version: &str, depth: usize) -> DependencyNode {
        DependencyNode {
            name: name.to_string(),
            version: Version::parse(version).unwrap(),
            resolved_url: format!("https://registry.example.com/{}/-/{}-{}.tgz", name, name, version),
            integrity: Some("sha512-abc".to_string()),
            dependencies: BTreeMap::new(),
            depth,
            edge_kinds: EdgeKinds::default(),
            parent: None,
        }
    }

    #[test]
    fn exact_version_resolve_produces_single_package_entry() {
        let manifest = Manifest::from_json(&json!({ "name": "app", "version": "1.0.0" })).unwrap();
        let mut nodes = BTreeMap::new();
        nodes.insert(("left-pad".to_string(), Version::parse("1.3.0").unwrap()), node("left-pad", "1.3.0", 1));
        let output = ResolveOutput { nodes, warnings: Vec::new() };

        let lockfile = lock(&manifest, &output);
        assert_eq!(lockfile.lockfile_version, LOCKFILE_VERSION);
        assert_eq!(lockfile.package_count(), 1);
        let entry = lockfile.get_package("node_modules/left-pad").unwrap();
        assert_eq!(entry.version, "1.3.0");
    }

    #[test]
    fn serialization_is_byte_stable_across_runs() {
        let manifest = Manifest::from_json(&json!({ "name": "app", "version": "1.0.0" })).unwrap();
        let mut nodes = BTreeMap::new();
        nodes.insert(("b".to_string(), Version::parse("1.0.0").unwrap()), node("b", "1.0.0", 1));
        nodes.insert(("a".to_string(), Version::parse("1.0.0").unwrap()), node("a", "1.0.0", 1));
        let output = ResolveOutput { nodes, warnings: Vec::new() };

        let first = lock(&manifest, &output).serialize().unwrap();
        let second = lock(&manifest, &output).serialize().unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        let a_pos = text.find("node_modules/a").unwrap();
        let b_pos = text.find("node_modules/b").unwrap();
        assert!(a_pos < b_pos, "packages must serialize in sorted install-path order");
    }

    #[test]
    fn round_trips_through_parse() {
        let manifest = Manifest::from_json(&json!({ "name": "app", "version": "1.0.0" })).unwrap();
        let mut nodes = BTreeMap::new();
        nodes.insert(("left-pad".to_string(), Version::parse("1.3.0").unwrap()), node("left-pad", "1.3.0", 1));
        let output = ResolveOutput { nodes, warnings: Vec::new() };
        let lockfile = lock(&manifest, &output);

        let bytes = lockfile.serialize().unwrap();
        let parsed = Lockfile::parse(&bytes).unwrap();
        assert_eq!(parsed, lockfile);
    }

    #[test]
    fn dev_and_optional_flags_round_trip() {
        let manifest = Manifest::from_json(&json!({ "name": "app" })).unwrap();
        let mut n = node("dev-tool", "2.0.0", 1);
        n.edge_kinds = EdgeKinds { dev: true, optional: false, peer: false };
        let mut nodes = BTreeMap::new();
        nodes.insert(("dev-tool".to_string(), Version::parse("2.0.0").unwrap()), n);
        let output = ResolveOutput { nodes, warnings: Vec::new() };

        let lockfile = lock(&manifest, &output);
        let entry = lockfile.get_package("node_modules/dev-tool").unwrap();
        assert!(entry.dev);
        assert!(!entry.optional);
    }
}
