use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::models::{Dependency, SourceType};

use super::shell;

const INFO_ARGS: [&str; 5] = ["info", "--json", "--manifest", "--recursive", "--all"];

/// Yarn Berry (v2+) projects, enumerated through `yarn info`.
pub struct YarnSource;

impl YarnSource {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct InfoLine {
    value: String,
    #[serde(default)]
    children: InfoChildren,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InfoChildren {
    version: Option<String>,
    manifest: Option<InfoManifest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InfoManifest {
    homepage: Option<String>,
    license: Option<String>,
}

impl super::Source for YarnSource {
    fn source_type(&self) -> SourceType {
        SourceType::Yarn
    }

    fn enabled(&self, root: &Path) -> bool {
        if !root.join("yarn.lock").exists() {
            return false;
        }
        match shell::execute(root, "yarn", &["--version"]) {
            Ok(version) => major_version(&version).is_some_and(|major| major >= 2),
            Err(e) => {
                debug!(error = %e, "yarn unavailable");
                false
            }
        }
    }

    #[instrument(skip(self))]
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError> {
        let output = shell::execute(root, "yarn", &INFO_ARGS)?;
        let paths = dependency_paths(root);
        parse_info_output(&output, &paths).map_err(|reason| SourceError::Command {
            command: format!("yarn {}", INFO_ARGS.join(" ")),
            reason,
        })
    }
}

fn major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.parse().ok()
}

/// Turn `yarn info --json` output (one JSON object per line) into dependencies.
fn parse_info_output(
    output: &str,
    paths: &HashMap<(String, String), PathBuf>,
) -> Result<Vec<Dependency>, String> {
    let mut deps = Vec::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let info: InfoLine =
            serde_json::from_str(line).map_err(|e| format!("unexpected output {line:?}: {e}"))?;

        // the project's own workspaces are not third-party dependencies
        if info.value.contains("@workspace:") {
            continue;
        }

        // "@scope/name@npm:1.2.3" → "@scope/name"
        let name = match info.value.rsplit_once('@') {
            Some((name, _)) if !name.is_empty() => name.to_string(),
            _ => {
                deps.push(
                    Dependency::new(SourceType::Yarn, info.value.clone(), "")
                        .with_error(format!("unable to read a package name from {:?}", info.value)),
                );
                continue;
            }
        };

        let manifest = info.children.manifest.unwrap_or_default();
        let mut dep = Dependency::new(
            SourceType::Yarn,
            &name,
            info.children.version.as_deref().unwrap_or_default(),
        )
        .with_metadata("homepage", manifest.homepage)
        .with_metadata("license", manifest.license);

        match &info.children.version {
            Some(version) => {
                if let Some(path) = paths.get(&(name, version.clone())) {
                    dep = dep.with_path(path);
                }
            }
            None => dep = dep.with_error(format!("no version reported for {}", info.value)),
        }
        deps.push(dep);
    }

    Ok(deps)
}

/// Map `(name, version)` to the directory of every installed `package.json`
/// under `node_modules`. Unreadable manifests are skipped.
fn dependency_paths(root: &Path) -> HashMap<(String, String), PathBuf> {
    let mut paths = HashMap::new();
    let node_modules = root.join("node_modules");
    if !node_modules.is_dir() {
        return paths;
    }

    for entry in WalkDir::new(&node_modules)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "package.json")
    {
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let Ok(json) = serde_json::from_str::<Value>(&content) else {
            continue;
        };
        let name = json.get("name").and_then(Value::as_str);
        let version = json.get("version").and_then(Value::as_str);
        if let (Some(name), Some(version), Some(dir)) = (name, version, entry.path().parent()) {
            paths
                .entry((name.to_string(), version.to_string()))
                .or_insert_with(|| dir.to_path_buf());
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const OUTPUT: &str = r#"{"value":"my-app@workspace:.","children":{"Version":"0.0.0-use.local"}}
{"value":"@babel/core@npm:7.22.5","children":{"Version":"7.22.5","Manifest":{"License":"MIT","Homepage":"https://babel.dev"}}}
{"value":"lodash@npm:4.17.21","children":{"Version":"4.17.21","Manifest":{"License":"MIT","Homepage":null}}}
{"value":"lodash@npm:3.10.1","children":{"Version":"3.10.1"}}

{"value":"mystery@npm:1.0.0","children":{}}
"#;

    #[test]
    fn test_parse_info_output() {
        let mut paths = HashMap::new();
        paths.insert(
            ("lodash".to_string(), "4.17.21".to_string()),
            PathBuf::from("/p/node_modules/lodash"),
        );

        let deps = parse_info_output(OUTPUT, &paths).unwrap();
        let found: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(
            found,
            vec![
                ("@babel/core", "7.22.5"),
                ("lodash", "4.17.21"),
                ("lodash", "3.10.1"),
                ("mystery", ""),
            ]
        );
        assert_eq!(deps[0].metadata["license"], "MIT");
        assert_eq!(deps[0].metadata["homepage"], "https://babel.dev");
        assert_eq!(deps[1].path.as_deref(), Some(Path::new("/p/node_modules/lodash")));
        assert_eq!(deps[2].path, None);
        assert_eq!(deps[3].errors.len(), 1);
    }

    #[test]
    fn test_unparseable_output_is_an_error() {
        assert!(parse_info_output("not json\n", &HashMap::new()).is_err());
    }

    #[test]
    fn test_dependency_paths_by_name_and_version() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("node_modules/a");
        let nested = dir.path().join("node_modules/a/node_modules/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(a.join("package.json"), r#"{"name":"a","version":"1.0.0"}"#).unwrap();
        fs::write(nested.join("package.json"), r#"{"name":"b","version":"2.0.0"}"#).unwrap();
        fs::write(dir.path().join("node_modules/bad.json"), "{").unwrap();

        let paths = dependency_paths(dir.path());
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[&("a".to_string(), "1.0.0".to_string())], a);
        assert_eq!(paths[&("b".to_string(), "2.0.0".to_string())], nested);
    }

    #[test]
    fn test_major_version() {
        assert_eq!(major_version("3.6.1\n"), Some(3));
        assert_eq!(major_version("1.22.19"), Some(1));
        assert_eq!(major_version("garbage"), None);
    }
}
