use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use tracing::instrument;

use crate::error::SourceError;
use crate::models::{Dependency, SourceType};

/// Python packages pinned in `Pipfile.lock` and `requirements.txt`.
///
/// `Pipfile.lock` wins when both list a package; names are compared
/// case-insensitively.
pub struct PipSource;

impl PipSource {
    pub fn new() -> Self {
        Self
    }
}

impl super::Source for PipSource {
    fn source_type(&self) -> SourceType {
        SourceType::Pip
    }

    fn enabled(&self, root: &Path) -> bool {
        root.join("Pipfile.lock").exists() || root.join("requirements.txt").exists()
    }

    #[instrument(skip(self))]
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError> {
        let mut deps: Vec<Dependency> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let pipfile_lock = root.join("Pipfile.lock");
        if pipfile_lock.exists() {
            for d in parse_pipfile_lock(&pipfile_lock)? {
                seen.insert(d.name.to_lowercase());
                deps.push(d);
            }
        }

        let requirements = root.join("requirements.txt");
        if requirements.exists() {
            for d in parse_requirements_txt(&requirements)? {
                if seen.insert(d.name.to_lowercase()) {
                    deps.push(d);
                }
            }
        }

        Ok(deps)
    }
}

fn manifest_error(path: &Path, reason: impl ToString) -> SourceError {
    SourceError::Manifest {
        source_type: SourceType::Pip,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Parse `requirements.txt`. Lines not pinned with `==` are kept with an error.
fn parse_requirements_txt(path: &Path) -> Result<Vec<Dependency>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| manifest_error(path, e))?;
    let pinned = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*==\s*([^\s;#]+)")
        .map_err(|e| manifest_error(path, e))?;
    let name_only = Regex::new(r"^([A-Za-z0-9_\-\.]+)").map_err(|e| manifest_error(path, e))?;
    let mut deps = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = pinned.captures(line) {
            deps.push(Dependency::new(SourceType::Pip, &caps[1], &caps[2]));
        } else if let Some(caps) = name_only.captures(line) {
            deps.push(
                Dependency::new(SourceType::Pip, &caps[1], "")
                    .with_error(format!("requirement `{line}` is not pinned to an exact version")),
            );
        }
    }

    Ok(deps)
}

/// Parse `Pipfile.lock` — JSON with `default` and `develop` sections.
fn parse_pipfile_lock(path: &Path) -> Result<Vec<Dependency>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| manifest_error(path, e))?;
    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| manifest_error(path, e))?;
    let mut deps = Vec::new();

    for section in &["default", "develop"] {
        if let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) {
            for (name, info) in pkgs {
                let dep = match info.get("version").and_then(|v| v.as_str()) {
                    Some(version) => {
                        Dependency::new(SourceType::Pip, name, version.trim_start_matches("=="))
                    }
                    None => Dependency::new(SourceType::Pip, name, "")
                        .with_error(format!("Pipfile.lock entry {name} has no version")),
                };
                deps.push(dep);
            }
        }
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Source;
    use std::fs;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_requirements_txt() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "requests==2.28.1").unwrap();
        writeln!(f, "flask>=2.0.0").unwrap();
        writeln!(f, "numpy==1.24.0 ; python_version >= '3.8'").unwrap();
        writeln!(f, "uvicorn[standard]==0.23.2").unwrap();
        writeln!(f, "-r other.txt").unwrap();

        let deps = parse_requirements_txt(f.path()).unwrap();
        assert_eq!(deps.len(), 4);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(deps[0].version, "2.28.1");
        assert_eq!(deps[1].name, "flask");
        assert_eq!(deps[1].errors.len(), 1);
        assert_eq!(deps[2].name, "numpy");
        assert_eq!(deps[3].name, "uvicorn");
        assert_eq!(deps[3].version, "0.23.2");
    }

    #[test]
    fn test_pipfile_lock_wins_over_requirements() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Pipfile.lock"),
            r#"{ "default": { "requests": { "version": "==2.31.0" } }, "develop": { "pytest": {} } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("requirements.txt"), "Requests==2.0.0\nidna==3.4\n").unwrap();

        let source = PipSource::new();
        assert!(source.enabled(dir.path()));
        let deps = source.enumerate_dependencies(dir.path()).unwrap();
        let found: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(found, vec![("requests", "2.31.0"), ("pytest", ""), ("idna", "3.4")]);
        assert_eq!(deps[1].errors.len(), 1);
    }

    #[test]
    fn test_corrupt_pipfile_lock_is_a_source_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Pipfile.lock"), "{").unwrap();
        assert!(PipSource::new().enumerate_dependencies(dir.path()).is_err());
    }
}
