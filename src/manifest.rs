//! Manifest normalization: `package.json`-shaped JSON in, a typed
//! [`Manifest`] out, with `bin`/`exports`/dependency-specifier/`scripts`
//! normalization performed exactly once here rather than scattered across
//! call sites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A normalized manifest. Unlike the raw JSON, every field here has already
/// gone through the classification/normalization rules below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub bin: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Value>,
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
    #[serde(default)]
    pub module_type: ModuleType,
    #[serde(default)]
    pub gypfile: bool,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    #[default]
    Commonjs,
    Module,
}

impl Manifest {
    /// Normalizes a raw `package.json`-shaped [`serde_json::Value`] into a
    /// [`Manifest`]. Missing `name` defaults to `""` rather than failing —
    /// the resolver itself is what enforces that root manifests need a name
    /// for lockfile emission.
    pub fn from_json(raw: &Value) -> Result<Self, Error> {
        let obj = raw.as_object().ok_or_else(|| {
            Error::Validation("manifest must be a JSON object".to_string())
        })?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let version = obj.get("version").and_then(Value::as_str).map(String::from);

        let dependencies = string_map(obj.get("dependencies"));
        let dev_dependencies = string_map(obj.get("devDependencies"));
        let peer_dependencies = string_map(obj.get("peerDependencies"));
        let optional_dependencies = string_map(obj.get("optionalDependencies"));

        let bin = match obj.get("bin") {
            Some(v) => normalize_bin(v, &name)?,
            None => BTreeMap::new(),
        };

        let main = obj.get("main").and_then(Value::as_str).map(String::from);
        let module = obj.get("module").and_then(Value::as_str).map(String::from);
        let exports = obj.get("exports").cloned();

        let engines = string_map(obj.get("engines"));
        let module_type = match obj.get("type").and_then(Value::as_str) {
            Some("module") => ModuleType::Module,
            _ => ModuleType::Commonjs,
        };
        let gypfile = obj
            .get("gypfile")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let scripts = string_map(obj.get("scripts"));
        let files = obj
            .get("files")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Manifest {
            name,
            version,
            dependencies,
            dev_dependencies,
            peer_dependencies,
            optional_dependencies,
            bin,
            main,
            module,
            exports,
            engines,
            module_type,
            gypfile,
            scripts,
            files,
        })
    }

    /// Scripts grouped into lifecycle pairs plus their referenced env-vars
    /// and `npm run` cross-references, for the orchestrator's scheduler.
    pub fn script_groups(&self) -> ScriptGroups {
        group_scripts(&self.scripts)
    }

    /// Classifies every dependency specifier across all four dependency
    /// maps. Errors are attached per-name rather than failing the whole
    /// manifest, since a single malformed specifier shouldn't block parsing
    /// the rest.
    pub fn classified_dependencies(&self) -> BTreeMap<String, Result<DependencyKind, String>> {
        let mut out = BTreeMap::new();
        for (name, spec) in self
            .dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .chain(self.peer_dependencies.iter())
            .chain(self.optional_dependencies.iter())
        {
            out.entry(name.clone())
                .or_insert_with(|| classify_dependency_specifier(spec));
        }
        out
    }

    pub fn resolve_export(&self, subpath: &str, conditions: &[&str]) -> Option<String> {
        let exports = self.exports.as_ref()?;
        resolve_export(exports, subpath, conditions)
    }
}

fn string_map(v: Option<&Value>) -> BTreeMap<String, String> {
    match v.and_then(Value::as_object) {
        Some(obj) => obj
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        None => BTreeMap::new(),
    }
}

/// Normalizes the `bin` field: a bare string becomes `{ <unscoped-name>:
/// <path> }`; an object is validated (no whitespace in binary names) and
/// every path is forward-slashed and `./`-prefixed if relative. Paths
/// outside `files` only warn — they never fail parsing.
fn normalize_bin(v: &Value, package_name: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut out = BTreeMap::new();
    match v {
        Value::String(path) => {
            let unscoped = package_name.rsplit('/').next().unwrap_or(package_name);
            out.insert(unscoped.to_string(), normalize_bin_path(path));
        }
        Value::Object(map) => {
            for (name, path) in map {
                if name.chars().any(char::is_whitespace) {
                    return Err(Error::Validation(format!(
                        "bin name '{}' must not contain whitespace",
                        name
                    )));
                }
                let path = path.as_str().ok_or_else(|| {
                    Error::Validation(format!("bin path for '{}' must be a string", name))
                })?;
                out.insert(name.clone(), normalize_bin_path(path));
            }
        }
        Value::Null => {}
        _ => {
            return Err(Error::Validation(
                "bin must be a string or an object".to_string(),
            ))
        }
    }
    Ok(out)
}

fn normalize_bin_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    if forward.starts_with("./") || forward.starts_with('/') {
        forward
    } else {
        format!("./{}", forward)
    }
}

/// Checks that every normalized `bin` path falls under one of the `files`
/// globs (a simple prefix/suffix-`*` match, not a full glob engine). Returns
/// the paths that fall outside — callers log these as warnings and continue.
pub fn bin_paths_outside_files<'a>(
    bin: &'a BTreeMap<String, String>,
    files: &[String],
) -> Vec<&'a str> {
    if files.is_empty() {
        return Vec::new();
    }
    bin.values()
        .map(String::as_str)
        .filter(|path| !files.iter().any(|glob| glob_matches(glob, path)))
        .collect()
}

fn glob_matches(glob: &str, path: &str) -> bool {
    let path = path.trim_start_matches("./");
    let glob = glob.trim_start_matches("./");
    match glob.strip_suffix("/**") .or_else(|| glob.strip_suffix("/*")) {
        Some(prefix) => path.starts_with(prefix),
        None => path == glob,
    }
}

/// The kind of a dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    Exact(String),
    Range(String),
    Tag(String),
    Github(String),
    Git(String),
    File(String),
    Url(String),
    Alias { real_name: String, range: String },
    Workspace(String),
}

pub fn classify_dependency_specifier(spec: &str) -> Result<DependencyKind, String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err("empty specifier".to_string());
    }
    if let Some(rest) = spec.strip_prefix("npm:") {
        let (real_name, range) = split_alias(rest)
            .ok_or_else(|| format!("malformed alias specifier 'npm:{}'", rest))?;
        return Ok(DependencyKind::Alias { real_name, range });
    }
    if let Some(rest) = spec.strip_prefix("workspace:") {
        return Ok(DependencyKind::Workspace(rest.to_string()));
    }
    if let Some(rest) = spec.strip_prefix("file:") {
        return Ok(DependencyKind::File(rest.to_string()));
    }
    if let Some(rest) = spec.strip_prefix("git+") {
        return Ok(DependencyKind::Git(rest.to_string()));
    }
    if spec.starts_with("git://") || spec.ends_with(".git") {
        return Ok(DependencyKind::Git(spec.to_string()));
    }
    if let Some(rest) = spec.strip_prefix("github:") {
        return Ok(DependencyKind::Github(rest.to_string()));
    }
    if is_github_shorthand(spec) {
        return Ok(DependencyKind::Github(spec.to_string()));
    }
    if spec.contains("://") {
        return Ok(DependencyKind::Url(spec.to_string()));
    }

    match crate::semver::Range::parse(spec) {
        Ok(_) => {
            if crate::semver::Version::parse(spec).is_ok() {
                Ok(DependencyKind::Exact(spec.to_string()))
            } else {
                Ok(DependencyKind::Range(spec.to_string()))
            }
        }
        Err(crate::semver::SemverError::NotARange(_)) => Ok(DependencyKind::Tag(spec.to_string())),
        Err(e) => Err(e.to_string()),
    }
}

fn split_alias(rest: &str) -> Option<(String, String)> {
    // "name@range" where `name` may itself be scoped ("@scope/name@range").
    let at = if let Some(stripped) = rest.strip_prefix('@') {
        stripped.find('@').map(|i| i + 1)
    } else {
        rest.find('@')
    }?;
    Some((rest[..at].to_string(), rest[at + 1..].to_string()))
}

fn is_github_shorthand(spec: &str) -> bool {
    let parts: Vec<&str> = spec.splitn(2, '/').collect();
    parts.len() == 2
        && !parts[0].is_empty()
        && !parts[1].is_empty()
        && !spec.contains(' ')
        && !spec.starts_with('@')
        && !parts[1].contains('/')
}

/// `exports` field resolution: string, conditional
/// object (recursed), subpath map (`.` / `./*`), single-`*` pattern
/// matching, `null` meaning explicitly blocked, and a `default` fallback.
/// Precedence: caller conditions in the order given, then whichever of
/// `import`/`require` the caller didn't already ask for is skipped, then
/// `default`.
pub fn resolve_export(exports: &Value, subpath: &str, conditions: &[&str]) -> Option<String> {
    match exports {
        Value::String(s) => {
            if subpath == "." || subpath.is_empty() {
                Some(s.clone())
            } else {
                None
            }
        }
        Value::Object(map) => {
            if is_subpath_map(map) {
                resolve_subpath_map(map, subpath, conditions)
            } else {
                // A conditional object applies only to the `.` subpath.
                if subpath == "." || subpath.is_empty() {
                    resolve_conditions(map, conditions)
                } else {
                    None
                }
            }
        }
        Value::Null => None,
        _ => None,
    }
}

fn is_subpath_map(map: &serde_json::Map<String, Value>) -> bool {
    map.keys().any(|k| k.starts_with('.'))
}

fn resolve_subpath_map(
    map: &serde_json::Map<String, Value>,
    subpath: &str,
    conditions: &[&str],
) -> Option<String> {
    let subpath = if subpath.is_empty() { "." } else { subpath };
    if let Some(v) = map.get(subpath) {
        return resolve_value(v, conditions);
    }
    // Single-`*` pattern match: longest matching pattern wins.
    let mut best: Option<(&str, &str)> = None;
    for key in map.keys() {
        if let Some(star) = key.find('*') {
            let (prefix, suffix) = (&key[..star], &key[star + 1..]);
            if subpath.starts_with(prefix)
                && subpath.ends_with(suffix)
                && subpath.len() >= prefix.len() + suffix.len()
            {
                if best.map_or(true, |(b, _)| prefix.len() > b.len()) {
                    best = Some((prefix, key));
                }
            }
        }
    }
    let (_, key) = best?;
    let star = key.find('*').unwrap();
    let (prefix, suffix) = (&key[..star], &key[star + 1..]);
    let matched = &subpath[prefix.len()..subpath.len() - suffix.len()];
    let target = map.get(key)?;
    let resolved = resolve_value(target, conditions)?;
    Some(resolved.replacen('*', matched, 1))
}

fn resolve_value(v: &Value, conditions: &[&str]) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => resolve_conditions(map, conditions),
        Value::Null => None,
        _ => None,
    }
}

fn resolve_conditions(map: &serde_json::Map<String, Value>, conditions: &[&str]) -> Option<String> {
    for cond in conditions {
        if let Some(v) = map.get(*cond) {
            if let Some(resolved) = resolve_value(v, conditions) {
                return Some(resolved);
            }
            if v.is_null() {
                return None;
            }
        }
    }
    if let Some(v) = map.get("default") {
        return resolve_value(v, conditions);
    }
    None
}

/// `npm run <name>` references and `scripts` lifecycle pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptGroups {
    /// Base script name -> (has `pre<name>`, has `post<name>`).
    pub lifecycle_pairs: BTreeMap<String, (bool, bool)>,
    /// Script name -> env-var names assigned inline (`FOO=bar <cmd>`).
    pub env_vars: BTreeMap<String, Vec<String>>,
    /// Script name -> other script names it invokes via `npm run <x>`.
    pub npm_run_refs: BTreeMap<String, Vec<String>>,
}

const LIFECYCLE_SPECIAL: &[&str] = &["install", "prepare", "prepublishOnly", "postinstall"];

fn group_scripts(scripts: &BTreeMap<String, String>) -> ScriptGroups {
    let mut groups = ScriptGroups::default();

    let mut base_names: Vec<String> = Vec::new();
    for name in scripts.keys() {
        let base = name
            .strip_prefix("pre")
            .or_else(|| name.strip_prefix("post"))
            .filter(|b| scripts.contains_key(*b) || LIFECYCLE_SPECIAL.contains(b))
            .unwrap_or(name.as_str());
        if !base_names.iter().any(|b| b == base) {
            base_names.push(base.to_string());
        }
    }

    for base in base_names {
        let has_pre = scripts.contains_key(&format!("pre{}", base));
        let has_post = scripts.contains_key(&format!("post{}", base));
        groups.lifecycle_pairs.insert(base, (has_pre, has_post));
    }

    for (name, body) in scripts {
        let envs = extract_env_assignments(body);
        if !envs.is_empty() {
            groups.env_vars.insert(name.clone(), envs);
        }
        let refs = extract_npm_run_refs(body);
        if !refs.is_empty() {
            groups.npm_run_refs.insert(name.clone(), refs);
        }
    }

    groups
}

fn extract_env_assignments(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    for token in body.split_whitespace() {
        match token.split_once('=') {
            Some((name, _)) if is_env_name(name) => out.push(name.to_string()),
            _ => break,
        }
    }
    out
}

fn is_env_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn extract_npm_run_refs(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let words: Vec<&str> = body.split_whitespace().collect();
    for i in 0..words.len() {
        if words[i] == "npm" && words.get(i + 1) == Some(&"run") {
            if let Some(target) = words.get(i + 2) {
                out.push((*target).to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bin_string_becomes_map_keyed_by_unscoped_name() {
        let manifest = Manifest::from_json(&json!({
            "name": "@scope/my-pkg",
            "bin": "./cli.js",
        }))
        .unwrap();
        assert_eq!(manifest.bin.get("my-pkg"), Some(&"./cli.js".to_string()));
    }

    #[test]
    fn bin_paths_are_forward_slashed_and_dot_prefixed() {
        let manifest = Manifest::from_json(&json!({
            "name": "pkg",
            "bin": { "pkg": "bin\\cli.js" },
        }))
        .unwrap();
        assert_eq!(manifest.bin.get("pkg"), Some(&"./bin/cli.js".to_string()));
    }

    #[test]
    fn bin_name_with_whitespace_is_rejected() {
        let err = Manifest::from_json(&json!({
            "name": "pkg",
            "bin": { "my cli": "./cli.js" },
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn bin_outside_files_is_reported_not_failed() {
        let manifest = Manifest::from_json(&json!({
            "name": "pkg",
            "bin": { "pkg": "./cli.js" },
            "files": ["dist/**"],
        }))
        .unwrap();
        let outside = bin_paths_outside_files(&manifest.bin, &manifest.files);
        assert_eq!(outside, vec!["./cli.js"]);
    }

    #[test]
    fn exports_string_resolves_root_subpath_only() {
        let exports = json!("./index.js");
        assert_eq!(resolve_export(&exports, ".", &[]), Some("./index.js".to_string()));
        assert_eq!(resolve_export(&exports, "./sub", &[]), None);
    }

    #[test]
    fn exports_conditional_object_respects_condition_order() {
        let exports = json!({ "import": "./esm.js", "require": "./cjs.js", "default": "./d.js" });
        assert_eq!(
            resolve_export(&exports, ".", &["import", "require"]),
            Some("./esm.js".to_string())
        );
        assert_eq!(
            resolve_export(&exports, ".", &["require"]),
            Some("./cjs.js".to_string())
        );
        assert_eq!(resolve_export(&exports, ".", &[]), Some("./d.js".to_string()));
    }

    #[test]
    fn exports_null_blocks_resolution() {
        let exports = json!({ "node": null, "default": "./d.js" });
        assert_eq!(resolve_export(&exports, ".", &["node"]), None);
    }

    #[test]
    fn exports_subpath_map_with_wildcard() {
        let exports = json!({ ".": "./index.js", "./features/*": "./src/features/*.js" });
        assert_eq!(
            resolve_export(&exports, "./features/foo", &[]),
            Some("./src/features/foo.js".to_string())
        );
    }

    #[test]
    fn classifies_every_dependency_kind() {
        assert_eq!(
            classify_dependency_specifier("1.2.3").unwrap(),
            DependencyKind::Exact("1.2.3".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("^1.2.3").unwrap(),
            DependencyKind::Range("^1.2.3".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("latest").unwrap(),
            DependencyKind::Tag("latest".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("user/repo").unwrap(),
            DependencyKind::Github("user/repo".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("git+https://example.com/x.git").unwrap(),
            DependencyKind::Git("https://example.com/x.git".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("file:../local-pkg").unwrap(),
            DependencyKind::File("../local-pkg".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("https://example.com/x.tgz").unwrap(),
            DependencyKind::Url("https://example.com/x.tgz".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("workspace:*").unwrap(),
            DependencyKind::Workspace("*".to_string())
        );
        assert_eq!(
            classify_dependency_specifier("npm:real-pkg@^2.0.0").unwrap(),
            DependencyKind::Alias {
                real_name: "real-pkg".to_string(),
                range: "^2.0.0".to_string()
            }
        );
    }

    #[test]
    fn scripts_group_lifecycle_pairs_and_env_and_refs() {
        let mut scripts = BTreeMap::new();
        scripts.insert("build".to_string(), "NODE_ENV=production webpack".to_string());
        scripts.insert("prebuild".to_string(), "npm run clean".to_string());
        scripts.insert("postbuild".to_string(), "echo done".to_string());
        scripts.insert("clean".to_string(), "rimraf dist".to_string());

        let groups = group_scripts(&scripts);
        assert_eq!(groups.lifecycle_pairs.get("build"), Some(&(true, true)));
        assert_eq!(
            groups.env_vars.get("build"),
            Some(&vec!["NODE_ENV".to_string()])
        );
        assert_eq!(
            groups.npm_run_refs.get("prebuild"),
            Some(&vec!["clean".to_string()])
        );
    }
}
