//! Dependency resolver and lockfile producer.
//!
//! An explicit breadth-first queue algorithm, deliberately not a
//! PubGrub/SAT-style solver (see DESIGN.md for the reasoning). Work items are
//! popped in FIFO order; each selects a version via
//! [`crate::semver::max_satisfying`], records a [`DependencyNode`], and
//! enqueues its children. Peers are constraints on already-materialized
//! nodes, never new work items. Cycles are caught by walking the ancestor
//! chain at enqueue time.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::config::ResolverConfig;
use crate::error::{Error, ErrorContext, Result};
use crate::registry::{PackageMetadata, RegistryFacade};
use crate::semver::{self, Range, SatisfyOptions, Version};

/// The kind of edge that introduced a node, mirroring the lockfile's
/// `dev`/`optional`/`peer` flags. A node reachable through more than one
/// kind records every kind that's true, so `merge` is just a boolean OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeKinds {
    pub dev: bool,
    pub optional: bool,
    pub peer: bool,
}

impl EdgeKinds {
    fn merge(&mut self, other: EdgeKinds) {
        self.dev |= other.dev;
        self.optional |= other.optional;
        self.peer |= other.peer;
    }
}

/// A materialized `(name, version)` selection in the resolved graph.
/// Structural sharing: the same `(name, version)` pair is always the same
/// node, never duplicated.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub name: String,
    pub version: Version,
    pub resolved_url: String,
    pub integrity: Option<String>,
    /// Declared dependency ranges of this node, by name, for emitting
    /// `dependencies?` in the lockfile.
    pub dependencies: BTreeMap<String, String>,
    pub depth: usize,
    pub edge_kinds: EdgeKinds,
    /// The node that first demanded this one, i.e. spec.md's
    /// `parent-node-ref?`. `None` for a direct root dependency. Used by
    /// [`hoist`] to nest conflicting duplicates under the install path of
    /// the node that actually needs them, rather than a synthetic slot.
    pub parent: Option<(String, Version)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepKind {
    Normal,
    Dev,
    Optional,
}

struct WorkItem {
    name: String,
    range: String,
    kind: DepKind,
    depth: usize,
    /// Ancestor `(name, version)` chain, for cycle detection.
    ancestors: Vec<(String, Version)>,
    demanded_by: String,
    /// The node that enqueued this item, recorded on the resulting
    /// `DependencyNode` as its `parent`. `None` for root dependencies.
    parent_key: Option<(String, Version)>,
}

struct PeerConstraint {
    name: String,
    range: String,
    demanded_by: String,
}

/// The resolved, pinned closure of a root manifest's dependencies.
pub struct ResolveOutput {
    /// Keyed by `(name, version)`; the canonical node storage.
    pub nodes: BTreeMap<(String, Version), DependencyNode>,
    /// Warnings collected along the way (unsatisfied optional deps, missing
    /// peers under non-strict mode, etc.) — never fatal.
    pub warnings: Vec<String>,
}

/// Walks `root_deps` (plus `dev`/`optional`/`peer` maps per `config`)
/// breadth-first against `registry`, producing a flat pinned node set.
/// Spec.md §4.5, steps 1-7.
pub async fn resolve(
    root_deps: &BTreeMap<String, String>,
    root_dev_deps: &BTreeMap<String, String>,
    root_peer_deps: &BTreeMap<String, String>,
    root_optional_deps: &BTreeMap<String, String>,
    registry: &RegistryFacade,
    config: &ResolverConfig,
) -> Result<ResolveOutput> {
    tracing::info!(
        direct = root_deps.len(),
        dev = root_dev_deps.len(),
        peer = root_peer_deps.len(),
        optional = root_optional_deps.len(),
        "starting dependency resolution"
    );

    let options = SatisfyOptions {
        include_prerelease: config.include_prerelease,
    };

    let mut queue: VecDeque<WorkItem> = VecDeque::new();
    // Step 1: seed the queue. Iteration order is fixed by sorted dependency
    // keys (BTreeMap already iterates in that order) so repeated resolves of
    // the same input are byte-stable.
    for (name, range) in root_deps {
        queue.push_back(WorkItem {
            name: name.clone(),
            range: range.clone(),
            kind: DepKind::Normal,
            depth: 1,
            ancestors: Vec::new(),
            demanded_by: "<root>".to_string(),
            parent_key: None,
        });
    }
    if config.include_dev {
        for (name, range) in root_dev_deps {
            queue.push_back(WorkItem {
                name: name.clone(),
                range: range.clone(),
                kind: DepKind::Dev,
                depth: 1,
                ancestors: Vec::new(),
                demanded_by: "<root>".to_string(),
                parent_key: None,
            });
        }
    }
    if config.include_optional {
        for (name, range) in root_optional_deps {
            queue.push_back(WorkItem {
                name: name.clone(),
                range: range.clone(),
                kind: DepKind::Optional,
                depth: 1,
                ancestors: Vec::new(),
                demanded_by: "<root>".to_string(),
                parent_key: None,
            });
        }
    }
    // root_peer_deps are constraints from the very start: there is no
    // "root node" to attach them to in the graph, so they're folded into
    // the same constraint list as transitively-discovered peers, checked
    // against whatever ends up resolved. Gated by `include_peer`, same as
    // every transitively-discovered peer below.
    let mut peer_constraints: Vec<PeerConstraint> = if config.include_peer {
        root_peer_deps
            .iter()
            .map(|(name, range)| PeerConstraint {
                name: name.clone(),
                range: range.clone(),
                demanded_by: "<root>".to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut nodes: BTreeMap<(String, Version), DependencyNode> = BTreeMap::new();
    // Every range ever demanded of a given package name, for backtracking
    // re-selection on conflict (step 4).
    let mut demanded_ranges: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    let mut warnings = Vec::new();

    while let Some(item) = queue.pop_front() {
        let doc = registry.get_package_metadata(&item.name).await?;
        let doc = match doc {
            Some(doc) => doc,
            None => {
                if item.kind == DepKind::Optional {
                    warnings.push(format!("optional dependency '{}' not found, skipping", item.name));
                    continue;
                }
                return Err(Error::resolution(
                    format!("package '{}' not found", item.name),
                    ErrorContext::default().with_package(&item.name),
                ));
            }
        };

        demanded_ranges
            .entry(item.name.clone())
            .or_default()
            .push((item.range.clone(), item.demanded_by.clone()));

        let range = Range::parse(&item.range).map_err(|e| {
            Error::resolution(
                format!("invalid range '{}' for '{}': {}", item.range, item.name, e),
                ErrorContext::default().with_package(&item.name),
            )
        })?;

        let selected = select_version(&doc, &range, &options);
        let selected = match selected {
            Some(v) => v,
            None => {
                if item.kind == DepKind::Optional {
                    warnings.push(format!(
                        "optional dependency '{}@{}' has no satisfying version, skipping",
                        item.name, item.range
                    ));
                    continue;
                }
                return Err(Error::resolution(
                    format!(
                        "no version of '{}' satisfies '{}' (tried {} candidates)",
                        item.name,
                        item.range,
                        doc.versions.len()
                    ),
                    ErrorContext::default()
                        .with_package(&item.name)
                        .with_version(&item.range),
                ));
            }
        };

        if item.ancestors.iter().any(|(n, v)| *n == item.name && *v == selected) {
            return Err(Error::resolution(
                format!("circular dependency on '{}@{}'", item.name, selected),
                ErrorContext::default().with_package(&item.name),
            ));
        }

        let key = (item.name.clone(), selected.clone());

        if let Some(existing) = nodes.get_mut(&key) {
            // Step 4: already resolved — verify the new range is still
            // satisfied; merge edge kinds either way.
            existing.edge_kinds.merge(edge_kinds_for(item.kind));
            if range.satisfies(&existing.version, &options) {
                continue;
            }
            // Attempt backtracking re-selection against the intersection
            // of every range ever demanded for this name.
            let all_ranges = demanded_ranges.get(&item.name).cloned().unwrap_or_default();
            let candidates: Vec<Version> = doc.versions.keys().filter_map(|v| Version::parse(v).ok()).collect();
            let reselected = all_ranges
                .iter()
                .filter_map(|(r, _)| Range::parse(r).ok())
                .try_fold(candidates, |acc, r| {
                    let filtered: Vec<Version> = acc
                        .into_iter()
                        .filter(|v| r.satisfies(v, &options))
                        .collect();
                    if filtered.is_empty() {
                        None
                    } else {
                        Some(filtered)
                    }
                })
                .and_then(|filtered| filtered.into_iter().max_by(|a, b| a.compare(b)));

            match reselected {
                Some(winner) if winner == existing.version => continue,
                Some(winner) => {
                    let version_meta = doc
                        .versions
                        .get(&winner.to_string())
                        .cloned()
                        .expect("reselected version must exist in document");
                    existing.version = winner;
                    existing.resolved_url = version_meta.dist.tarball.clone();
                    existing.integrity = version_meta
                        .dist
                        .integrity
                        .clone()
                        .or_else(|| version_meta.dist.shasum.clone());
                    existing.dependencies = version_meta.dependencies.clone();
                }
                None => {
                    let demanders: Vec<String> = all_ranges
                        .iter()
                        .map(|(r, by)| format!("{} requires {}@{}", by, item.name, r))
                        .collect();
                    return Err(Error::resolution(
                        format!(
                            "conflicting requirements for '{}': {}",
                            item.name,
                            demanders.join(", ")
                        ),
                        ErrorContext::default().with_package(&item.name),
                    ));
                }
            }
            continue;
        }

        // Step 5: brand-new node — record it, enqueue dependencies and
        // (if enabled) optionalDependencies; peers become constraints, not
        // new materializations.
        let version_meta = doc
            .versions
            .get(&selected.to_string())
            .cloned()
            .expect("max_satisfying must return a version present in the document");

        let node = DependencyNode {
            name: item.name.clone(),
            version: selected.clone(),
            resolved_url: version_meta.dist.tarball.clone(),
            integrity: version_meta
                .dist
                .integrity
                .clone()
                .or_else(|| version_meta.dist.shasum.clone()),
            dependencies: version_meta.dependencies.clone(),
            depth: item.depth,
            edge_kinds: edge_kinds_for(item.kind),
            parent: item.parent_key.clone(),
        };
        nodes.insert(key.clone(), node);

        let mut ancestors = item.ancestors.clone();
        ancestors.push((item.name.clone(), selected.clone()));
        let demanded_by = format!("{}@{}", item.name, selected);

        for (dep_name, dep_range) in &version_meta.dependencies {
            queue.push_back(WorkItem {
                name: dep_name.clone(),
                range: dep_range.clone(),
                kind: DepKind::Normal,
                depth: item.depth + 1,
                ancestors: ancestors.clone(),
                demanded_by: demanded_by.clone(),
                parent_key: Some(key.clone()),
            });
        }
        if config.include_optional {
            for (dep_name, dep_range) in &version_meta.optional_dependencies {
                queue.push_back(WorkItem {
                    name: dep_name.clone(),
                    range: dep_range.clone(),
                    kind: DepKind::Optional,
                    depth: item.depth + 1,
                    ancestors: ancestors.clone(),
                    demanded_by: demanded_by.clone(),
                    parent_key: Some(key.clone()),
                });
            }
        }
        if config.include_peer {
            for (peer_name, peer_range) in &version_meta.peer_dependencies {
                peer_constraints.push(PeerConstraint {
                    name: peer_name.clone(),
                    range: peer_range.clone(),
                    demanded_by: demanded_by.clone(),
                });
            }
        }
    }

    // Step 5 continued: peers are constraints on nodes already present.
    for constraint in &peer_constraints {
        let present = nodes.keys().find(|(name, _)| name == &constraint.name);
        match present {
            Some((_, version)) => {
                if let Ok(range) = Range::parse(&constraint.range) {
                    if !range.satisfies(version, &options) {
                        warnings.push(format!(
                            "{} requires peer '{}@{}' but '{}@{}' is installed",
                            constraint.demanded_by, constraint.name, constraint.range, constraint.name, version
                        ));
                    }
                }
            }
            None => {
                let msg = format!(
                    "{} requires peer '{}@{}' which is not installed",
                    constraint.demanded_by, constraint.name, constraint.range
                );
                if config.strict {
                    return Err(Error::resolution(
                        msg,
                        ErrorContext::default().with_package(&constraint.name),
                    ));
                }
                warnings.push(msg);
            }
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "resolution warning");
    }
    tracing::info!(nodes = nodes.len(), warnings = warnings.len(), "resolution complete");

    Ok(ResolveOutput { nodes, warnings })
}

fn edge_kinds_for(kind: DepKind) -> EdgeKinds {
    match kind {
        DepKind::Normal => EdgeKinds::default(),
        DepKind::Dev => EdgeKinds { dev: true, ..Default::default() },
        DepKind::Optional => EdgeKinds { optional: true, ..Default::default() },
    }
}

/// Step 2: candidate set is every version in the document (pruning to
/// versions whose precedence is below the range's lower bound is an
/// optimization `max_satisfying` itself doesn't need at this scale; the
/// full version list is small enough in practice to filter directly).
fn select_version(doc: &PackageMetadata, range: &Range, options: &SatisfyOptions) -> Option<Version> {
    let candidates: Vec<Version> = doc.versions.keys().filter_map(|v| Version::parse(v).ok()).collect();
    semver::max_satisfying(&candidates, range, options).cloned()
}

/// Assigns each resolved node to the shallowest `node_modules/...`
/// install-path where no sibling of the same name already occupies that
/// path with a different version. A conflicting duplicate is nested under
/// the install path of the node that actually demanded it (its
/// [`DependencyNode::parent`]) — `node_modules/<parent>/node_modules/<name>`
/// — rather than a synthetic slot, so the path mirrors where npm itself
/// would place it. Same-version nodes at a shallower depth are skipped
/// since the shallower path already covers them.
pub fn hoist(output: &ResolveOutput) -> BTreeMap<String, Rc<DependencyNode>> {
    let mut by_depth: Vec<(&(String, Version), &DependencyNode)> = output.nodes.iter().collect();
    by_depth.sort_by(|((name_a, version_a), node_a), ((name_b, version_b), node_b)| {
        node_a
            .depth
            .cmp(&node_b.depth)
            .then_with(|| name_a.cmp(name_b))
            .then_with(|| version_a.compare(version_b))
    });

    let mut occupied: BTreeMap<String, Version> = BTreeMap::new();
    let mut paths: BTreeMap<String, Rc<DependencyNode>> = BTreeMap::new();
    let mut assigned_path: BTreeMap<(String, Version), String> = BTreeMap::new();

    for ((name, version), node) in by_depth {
        let root_path = format!("node_modules/{}", name);
        match occupied.get(name) {
            None => {
                occupied.insert(name.clone(), version.clone());
                assigned_path.insert((name.clone(), version.clone()), root_path.clone());
                paths.insert(root_path, Rc::new(node.clone()));
            }
            Some(existing) if existing == version => {
                // Same selection already hoisted at the root path.
                assigned_path.insert((name.clone(), version.clone()), root_path);
            }
            Some(_) => {
                let parent_path = node
                    .parent
                    .as_ref()
                    .and_then(|parent_key| assigned_path.get(parent_key))
                    .cloned()
                    .unwrap_or_else(|| "node_modules".to_string());
                let nested_path = format!("{}/node_modules/{}", parent_path, name);
                assigned_path.insert((name.clone(), version.clone()), nested_path.clone());
                paths.insert(nested_path, Rc::new(node.clone()));
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, RegistryConfig};
    use crate::registry::{InMemoryTransport, RegistryFacade, TransportResponse};
    use serde_json::json;
    use std::rc::Rc as StdRc;

    fn facade(transport: StdRc<InMemoryTransport>) -> RegistryFacade {
        RegistryFacade::new(
            transport,
            &RegistryConfig {
                url: "https://registry.example.com".to_string(),
                ..RegistryConfig::default()
            },
            &CacheConfig::default(),
        )
    }

    fn push_package(transport: &InMemoryTransport, name: &str, versions: &[(&str, serde_json::Value)]) {
        let mut versions_map = serde_json::Map::new();
        let mut latest = None;
        for (v, deps) in versions {
            versions_map.insert(
                v.to_string(),
                json!({
                    "name": name,
                    "version": v,
                    "dependencies": deps,
                    "dist": { "tarball": format!("https://registry.example.com/{}/-/{}-{}.tgz", name, name, v) }
                }),
            );
            latest = Some(v.to_string());
        }
        let doc = json!({
            "name": name,
            "dist-tags": { "latest": latest.unwrap() },
            "versions": versions_map,
        });
        transport.push_json(&format!("https://registry.example.com/{}", name), 200, &doc);
    }

    #[tokio::test]
    async fn exact_version_resolve_single_entry() {
        let transport = StdRc::new(InMemoryTransport::new());
        push_package(&transport, "left-pad", &[("1.3.0", json!({}))]);
        let registry = facade(transport);

        let mut root = BTreeMap::new();
        root.insert("left-pad".to_string(), "1.3.0".to_string());

        let out = resolve(
            &root,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &registry,
            &ResolverConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(out.nodes.len(), 1);
        let node = out.nodes.values().next().unwrap();
        assert_eq!(node.name, "left-pad");
        assert_eq!(node.version.to_string(), "1.3.0");
    }

    #[tokio::test]
    async fn caret_conflict_hoists_the_max_satisfying_version() {
        let transport = StdRc::new(InMemoryTransport::new());
        push_package(&transport, "a", &[("1.0.0", json!({})), ("1.2.0", json!({}))]);
        push_package(&transport, "b", &[("1.0.0", json!({ "a": "^1.0.0" }))]);
        let registry = facade(transport);

        let mut root = BTreeMap::new();
        root.insert("a".to_string(), "^1.0.0".to_string());
        root.insert("b".to_string(), "1.0.0".to_string());

        let out = resolve(
            &root,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &registry,
            &ResolverConfig::default(),
        )
        .await
        .unwrap();

        let a_versions: Vec<_> = out
            .nodes
            .keys()
            .filter(|(name, _)| name == "a")
            .map(|(_, v)| v.to_string())
            .collect();
        assert_eq!(a_versions, vec!["1.2.0".to_string()]);

        let hoisted = hoist(&out);
        assert!(hoisted.contains_key("node_modules/a"));
    }

    #[tokio::test]
    async fn hard_conflict_produces_two_distinct_a_nodes() {
        let transport = StdRc::new(InMemoryTransport::new());
        push_package(&transport, "a", &[("1.2.0", json!({})), ("2.3.0", json!({}))]);
        push_package(&transport, "b", &[("1.0.0", json!({ "a": "^2.0.0" }))]);
        let registry = facade(transport);

        let mut root = BTreeMap::new();
        root.insert("a".to_string(), "^1.0.0".to_string());
        root.insert("b".to_string(), "1.0.0".to_string());

        let out = resolve(
            &root,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &registry,
            &ResolverConfig::default(),
        )
        .await
        .unwrap();

        let mut a_versions: Vec<String> = out
            .nodes
            .keys()
            .filter(|(name, _)| name == "a")
            .map(|(_, v)| v.to_string())
            .collect();
        a_versions.sort();
        assert_eq!(a_versions, vec!["1.2.0".to_string(), "2.3.0".to_string()]);

        // a@1.2.0 satisfies root's own ^1.0.0 and hoists to the top level;
        // a@2.3.0 is only reachable through b's ^2.0.0 constraint, so it
        // nests under b's own install path rather than a synthetic slot.
        let hoisted = hoist(&out);
        let a_root = hoisted.get("node_modules/a").expect("a@1.2.0 hoists to the root path");
        assert_eq!(a_root.version.to_string(), "1.2.0");
        let a_nested = hoisted
            .get("node_modules/b/node_modules/a")
            .expect("a@2.3.0 nests under b's install path");
        assert_eq!(a_nested.version.to_string(), "2.3.0");
    }

    #[tokio::test]
    async fn missing_required_package_fails_resolution() {
        let transport = StdRc::new(InMemoryTransport::new());
        transport.push(
            "https://registry.example.com/ghost",
            Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
        let registry = facade(transport);
        let mut root = BTreeMap::new();
        root.insert("ghost".to_string(), "1.0.0".to_string());

        let err = resolve(
            &root,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &registry,
            &ResolverConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.has_code(crate::error::ErrorCode::ERESOLUTION));
    }

    #[tokio::test]
    async fn missing_optional_dependency_only_warns() {
        let transport = StdRc::new(InMemoryTransport::new());
        transport.push(
            "https://registry.example.com/ghost",
            Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
        let registry = facade(transport);
        let mut optional = BTreeMap::new();
        optional.insert("ghost".to_string(), "1.0.0".to_string());

        let out = resolve(
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &optional,
            &registry,
            &ResolverConfig::default(),
        )
        .await
        .unwrap();
        assert!(out.nodes.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[tokio::test]
    async fn strict_mode_fails_on_missing_peer() {
        let transport = StdRc::new(InMemoryTransport::new());
        push_package(&transport, "needs-peer", &[("1.0.0", json!({}))]);
        let registry = facade(transport);

        let mut root = BTreeMap::new();
        root.insert("needs-peer".to_string(), "1.0.0".to_string());
        let mut peers = BTreeMap::new();
        peers.insert("react".to_string(), "^18.0.0".to_string());

        let config = ResolverConfig {
            strict: true,
            include_peer: true,
            ..ResolverConfig::default()
        };
        let err = resolve(&root, &BTreeMap::new(), &peers, &BTreeMap::new(), &registry, &config)
            .await
            .unwrap_err();
        assert!(err.has_code(crate::error::ErrorCode::ERESOLUTION));
    }
}
