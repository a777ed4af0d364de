use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One dependency as discovered by a [`Source`](crate::sources::Source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub source_type: SourceType,
    /// Where the dependency's files live on disk, when the adapter could resolve it.
    pub path: Option<PathBuf>,
    /// Non-fatal problems hit while resolving this one dependency.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Adapter-supplied extras (`license`, `homepage`, ...), copied into the cache record.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Dependency {
    pub fn new(source_type: SourceType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source_type,
            path: None,
            errors: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Record a metadata entry, ignoring empty values.
    pub fn with_metadata(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            let value = value.into();
            if !value.is_empty() {
                self.metadata.insert(key.to_string(), value);
            }
        }
        self
    }
}

/// Package ecosystem tag. Doubles as the cache sub-directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Cargo,
    Npm,
    Pip,
    Swift,
    Yarn,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Cargo,
        SourceType::Npm,
        SourceType::Pip,
        SourceType::Swift,
        SourceType::Yarn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Cargo => "cargo",
            SourceType::Npm => "npm",
            SourceType::Pip => "pip",
            SourceType::Swift => "swift",
            SourceType::Yarn => "yarn",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source type `{s}`"))
    }
}

/// A license file found alongside a dependency, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseText {
    /// File name the text was read from, e.g. `LICENSE-MIT`.
    pub sources: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trips_through_str() {
        for t in SourceType::ALL {
            assert_eq!(t.as_str().parse::<SourceType>().unwrap(), t);
        }
        assert_eq!("NPM".parse::<SourceType>().unwrap(), SourceType::Npm);
        assert!("bundler".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_with_metadata_skips_empty_values() {
        let dep = Dependency::new(SourceType::Npm, "left-pad", "1.3.0")
            .with_metadata("license", Some("MIT"))
            .with_metadata("homepage", Some(""))
            .with_metadata("repository", None::<String>);
        assert_eq!(dep.metadata.len(), 1);
        assert_eq!(dep.metadata["license"], "MIT");
    }
}
