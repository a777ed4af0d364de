use std::path::Path;

use serde_json::Value;
use tracing::instrument;

use crate::error::SourceError;
use crate::models::{Dependency, SourceType};

const NODE_MODULES: &str = "node_modules/";

/// Packages pinned in `package-lock.json` (lockfile v2/v3).
pub struct NpmSource;

impl NpmSource {
    pub fn new() -> Self {
        Self
    }
}

impl super::Source for NpmSource {
    fn source_type(&self) -> SourceType {
        SourceType::Npm
    }

    fn enabled(&self, root: &Path) -> bool {
        root.join("package-lock.json").exists()
    }

    #[instrument(skip(self))]
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError> {
        let lock_path = root.join("package-lock.json");
        let manifest_error = |reason: String| SourceError::Manifest {
            source_type: SourceType::Npm,
            path: lock_path.clone(),
            reason,
        };

        let content = std::fs::read_to_string(&lock_path).map_err(|e| manifest_error(e.to_string()))?;
        let json: Value = serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;
        let packages = json
            .get("packages")
            .and_then(|v| v.as_object())
            .ok_or_else(|| manifest_error("no `packages` map (lockfile v1 is not supported)".into()))?;

        let mut deps = Vec::new();
        for (pkg_path, info) in packages {
            // Skip the root entry and workspace members, which live outside node_modules
            let Some(idx) = pkg_path.rfind(NODE_MODULES) else {
                continue;
            };
            if info.get("link").and_then(Value::as_bool) == Some(true) {
                continue;
            }

            // "node_modules/a/node_modules/@scope/b" → "@scope/b"
            let name = &pkg_path[idx + NODE_MODULES.len()..];
            let install_dir = root.join(pkg_path);
            let installed = read_package_json(&install_dir.join("package.json"));

            let version = info.get("version").and_then(Value::as_str);
            let license = license_field(info).or_else(|| installed.as_ref().and_then(license_field));
            let homepage = installed
                .as_ref()
                .and_then(|p| p.get("homepage"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let mut dep = Dependency::new(SourceType::Npm, name, version.unwrap_or_default())
                .with_metadata("license", license)
                .with_metadata("homepage", homepage);
            if version.is_none() {
                dep = dep.with_error(format!("package-lock.json entry {pkg_path} has no version"));
            }
            if install_dir.is_dir() {
                dep = dep.with_path(install_dir);
            }
            deps.push(dep);
        }

        Ok(deps)
    }
}

fn read_package_json(path: &Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// `"license": "MIT"`, or the legacy `"license": { "type": "MIT" }`.
fn license_field(json: &Value) -> Option<String> {
    match json.get("license")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
