//! `npmx init` - scaffold a new `package.json` in the current directory.

use std::env;
use std::fs;

use anyhow::{bail, Result};
use serde_json::json;

use super::MANIFEST_NAME;

pub fn run(name: Option<String>) -> Result<()> {
    let cwd = env::current_dir()?;
    let manifest_path = cwd.join(MANIFEST_NAME);
    if manifest_path.exists() {
        bail!("{} already exists in {}", MANIFEST_NAME, cwd.display());
    }

    let package_name = name.unwrap_or_else(|| {
        cwd.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string())
    });

    let manifest = json!({
        "name": package_name,
        "version": "0.1.0",
        "dependencies": {},
        "devDependencies": {},
        "scripts": {},
    });

    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)? + "\n")?;
    println!("Wrote {}", manifest_path.display());
    Ok(())
}
