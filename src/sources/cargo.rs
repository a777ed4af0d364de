use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::models::{Dependency, SourceType};

#[derive(Debug, Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    /// Packages without a `source` field are local workspace members.
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrateManifest {
    package: CrateManifestPackage,
}

#[derive(Debug, Deserialize)]
struct CrateManifestPackage {
    license: Option<String>,
    homepage: Option<String>,
    repository: Option<String>,
}

/// Crates listed in `Cargo.lock`, located in the local registry source cache.
pub struct CargoSource {
    cargo_home: Option<PathBuf>,
}

impl CargoSource {
    pub fn new() -> Self {
        let cargo_home = std::env::var_os("CARGO_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".cargo")));
        Self { cargo_home }
    }

    #[cfg(test)]
    fn with_cargo_home(cargo_home: &Path) -> Self {
        Self {
            cargo_home: Some(cargo_home.to_path_buf()),
        }
    }

    /// `$CARGO_HOME/registry/src/<index>` directories.
    fn registry_dirs(&self) -> Vec<PathBuf> {
        let Some(home) = &self.cargo_home else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(home.join("registry").join("src")) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

impl super::Source for CargoSource {
    fn source_type(&self) -> SourceType {
        SourceType::Cargo
    }

    fn enabled(&self, root: &Path) -> bool {
        root.join("Cargo.lock").exists()
    }

    #[instrument(skip(self))]
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError> {
        let lock_path = root.join("Cargo.lock");
        let manifest_error = |reason: String| SourceError::Manifest {
            source_type: SourceType::Cargo,
            path: lock_path.clone(),
            reason,
        };

        let content = std::fs::read_to_string(&lock_path).map_err(|e| manifest_error(e.to_string()))?;
        let lock: CargoLock = toml::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;
        let registries = self.registry_dirs();

        let deps = lock
            .package
            .into_iter()
            .filter(|p| p.source.is_some())
            .map(|p| {
                let dep = Dependency::new(SourceType::Cargo, &p.name, &p.version);
                let dir_name = format!("{}-{}", p.name, p.version);
                match registries.iter().map(|r| r.join(&dir_name)).find(|d| d.is_dir()) {
                    Some(path) => with_manifest_metadata(dep, &path).with_path(path),
                    None => {
                        debug!(name = %p.name, version = %p.version, "crate source not found locally");
                        dep.with_error(format!(
                            "crate source {dir_name} not found in $CARGO_HOME/registry/src"
                        ))
                    }
                }
            })
            .collect();

        Ok(deps)
    }
}

fn with_manifest_metadata(dep: Dependency, dir: &Path) -> Dependency {
    let manifest_path = dir.join("Cargo.toml");
    let manifest = std::fs::read_to_string(&manifest_path)
        .map_err(|e| e.to_string())
        .and_then(|content| toml::from_str::<CrateManifest>(&content).map_err(|e| e.to_string()));

    match manifest {
        Ok(manifest) => dep
            .with_metadata("license", manifest.package.license)
            .with_metadata("homepage", manifest.package.homepage)
            .with_metadata("repository", manifest.package.repository),
        Err(e) => dep.with_error(format!("unable to read {}: {e}", manifest_path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Source;
    use std::fs;
    use tempfile::TempDir;

    const LOCK: &str = r#"
version = 3

[[package]]
name = "my-app"
version = "0.1.0"

[[package]]
name = "serde"
version = "1.0.150"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "abc123"

[[package]]
name = "tokio"
version = "1.25.0"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "def456"
"#;

    #[test]
    fn test_parse_cargo_lock_skips_workspace_members() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::write(project.path().join("Cargo.lock"), LOCK).unwrap();

        let source = CargoSource::with_cargo_home(home.path());
        assert!(source.enabled(project.path()));
        let deps = source.enumerate_dependencies(project.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "serde");
        assert_eq!(deps[1].name, "tokio");
        assert_eq!(deps[1].path, None);
        assert_eq!(deps[1].errors.len(), 1);
        assert!(deps[1].errors[0].contains("tokio-1.25.0 not found"));
    }

    #[test]
    fn test_locates_registry_sources_and_reads_metadata() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::write(project.path().join("Cargo.lock"), LOCK).unwrap();

        let serde_dir = home.path().join("registry/src/index.crates.io-abc/serde-1.0.150");
        fs::create_dir_all(&serde_dir).unwrap();
        fs::write(
            serde_dir.join("Cargo.toml"),
            "[package]\nname = \"serde\"\nlicense = \"MIT OR Apache-2.0\"\nhomepage = \"https://serde.rs\"\n",
        )
        .unwrap();
        let tokio_dir = home.path().join("registry/src/index.crates.io-abc/tokio-1.25.0");
        fs::create_dir_all(&tokio_dir).unwrap();

        let deps = CargoSource::with_cargo_home(home.path())
            .enumerate_dependencies(project.path())
            .unwrap();
        assert_eq!(deps[0].path.as_deref(), Some(serde_dir.as_path()));
        assert_eq!(deps[0].metadata["license"], "MIT OR Apache-2.0");
        assert_eq!(deps[0].metadata["homepage"], "https://serde.rs");
        assert!(deps[0].errors.is_empty());

        // directory present but no manifest: recorded on the dependency, not fatal
        assert_eq!(deps[1].errors.len(), 1);
        assert!(deps[1].errors[0].contains("Cargo.toml"));
    }

    #[test]
    fn test_corrupt_lock_is_a_source_error() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("Cargo.lock"), "[[package]\nname = ").unwrap();
        let err = CargoSource::new().enumerate_dependencies(project.path()).unwrap_err();
        assert!(matches!(err, SourceError::Manifest { source_type: SourceType::Cargo, .. }));
    }

    #[test]
    fn test_disabled_without_lock() {
        let project = TempDir::new().unwrap();
        assert!(!CargoSource::new().enabled(project.path()));
    }
}
