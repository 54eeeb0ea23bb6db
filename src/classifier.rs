//! Execution tier classification.
//!
//! A pure function over a normalized [`Manifest`](crate::manifest::Manifest)
//! — no I/O, no suspension, matching §5's rule that classification must not
//! take locks or suspend.

use crate::manifest::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Pure ES module, runnable in a bare JS sandbox.
    Tier1 = 1,
    /// ES module requiring one or more host-provided built-in shims.
    Tier2 = 2,
    /// Not runnable in the sandbox at all.
    Tier3 = 3,
}

/// Dependencies that can never be shimmed; any direct dependency on one of
/// these forces tier 3. Kept as a `const` slice so revisiting the policy
/// later is a one-line diff.
pub const UNSHIMMABLE_BUILTINS: &[&str] = &[
    "child_process",
    "cluster",
    "worker_threads",
    "v8",
    "vm",
    "repl",
    "net",
    "dgram",
    "tls",
    "http2",
    "async_hooks",
    "inspector",
];

/// Built-ins the orchestrator can back with a virtual-filesystem/host shim;
/// a direct dependency on one of these only costs tier 2.
pub const SHIMMABLE_BUILTINS: &[&str] = &[
    "fs", "path", "process", "buffer", "crypto", "events", "stream", "url", "util",
];

const NATIVE_SCRIPT_TRIGGERS: &[&str] = &["node-gyp", "prebuild"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tier: Tier,
    pub required_builtins: Vec<String>,
    pub reason: String,
}

/// Classifies `manifest`, evaluating the rules in order — first match wins.
pub fn classify(manifest: &Manifest) -> Classification {
    if let Some(reason) = tier3_signal(manifest) {
        return Classification {
            tier: Tier::Tier3,
            required_builtins: Vec::new(),
            reason,
        };
    }

    if let Some(name) = manifest
        .dependencies
        .keys()
        .find(|name| UNSHIMMABLE_BUILTINS.contains(&name.as_str()))
    {
        return Classification {
            tier: Tier::Tier3,
            required_builtins: Vec::new(),
            reason: format!("depends on unshimmable built-in '{}'", name),
        };
    }

    let shimmed: Vec<String> = manifest
        .dependencies
        .keys()
        .filter(|name| SHIMMABLE_BUILTINS.contains(&name.as_str()))
        .cloned()
        .collect();
    if !shimmed.is_empty() {
        return Classification {
            tier: Tier::Tier2,
            required_builtins: shimmed,
            reason: "depends on shimmable built-ins".to_string(),
        };
    }

    Classification {
        tier: Tier::Tier1,
        required_builtins: Vec::new(),
        reason: "pure ES module".to_string(),
    }
}

fn tier3_signal(manifest: &Manifest) -> Option<String> {
    if manifest.gypfile {
        return Some("declares gypfile".to_string());
    }
    if let Some(node_req) = manifest.engines.get("node") {
        if requires_unshimmable_engine_api(node_req) {
            return Some(format!(
                "engines.node constraint '{}' requires unshimmable APIs",
                node_req
            ));
        }
    }
    for (name, body) in &manifest.scripts {
        if let Some(trigger) = NATIVE_SCRIPT_TRIGGERS
            .iter()
            .find(|t| body.contains(*t))
        {
            return Some(format!("script '{}' invokes native build tool '{}'", name, trigger));
        }
        if name == "postinstall" && invokes_compiler(body) {
            return Some("postinstall invokes a compiler".to_string());
        }
    }
    None
}

/// `engines.node` as a classification signal is about known-unshimmable
/// APIs, not version ranges per se; in practice the only trigger is an
/// explicit opt-out marker packages sometimes set alongside native
/// bindings.
fn requires_unshimmable_engine_api(node_req: &str) -> bool {
    node_req.trim() == "native"
}

fn invokes_compiler(script_body: &str) -> bool {
    ["gcc", "clang", "cc ", "cl.exe", "make"]
        .iter()
        .any(|tool| script_body.contains(tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Manifest {
        Manifest::from_json(&value).unwrap()
    }

    #[test]
    fn pure_esm_with_no_builtins_is_tier1() {
        let m = manifest(json!({ "name": "left-pad" }));
        let c = classify(&m);
        assert_eq!(c.tier, Tier::Tier1);
        assert!(c.required_builtins.is_empty());
    }

    #[test]
    fn fs_dependency_is_tier2_and_lists_builtin() {
        let m = manifest(json!({
            "name": "fs-extra",
            "dependencies": { "fs": "*", "path": "*" },
        }));
        let c = classify(&m);
        assert_eq!(c.tier, Tier::Tier2);
        assert!(c.required_builtins.contains(&"fs".to_string()));
        assert!(c.required_builtins.contains(&"path".to_string()));
    }

    #[test]
    fn gypfile_forces_tier3_with_named_trigger() {
        let m = manifest(json!({ "name": "native-thing", "gypfile": true }));
        let c = classify(&m);
        assert_eq!(c.tier, Tier::Tier3);
        assert!(c.reason.contains("gypfile"));
    }

    #[test]
    fn child_process_dependency_forces_tier3() {
        let m = manifest(json!({
            "name": "spawner",
            "dependencies": { "child_process": "*" },
        }));
        assert_eq!(classify(&m).tier, Tier::Tier3);
    }

    #[test]
    fn node_gyp_script_forces_tier3() {
        let m = manifest(json!({
            "name": "needs-build",
            "scripts": { "install": "node-gyp rebuild" },
        }));
        let c = classify(&m);
        assert_eq!(c.tier, Tier::Tier3);
        assert!(c.reason.contains("node-gyp"));
    }

    #[test]
    fn rule_order_prefers_earliest_match() {
        // gypfile (rule 1) should win even though child_process (rule 2)
        // also matches.
        let m = manifest(json!({
            "name": "both",
            "gypfile": true,
            "dependencies": { "child_process": "*" },
        }));
        let c = classify(&m);
        assert_eq!(c.tier, Tier::Tier3);
        assert!(c.reason.contains("gypfile"));
    }
}
