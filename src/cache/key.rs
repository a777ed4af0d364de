use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::models::SourceType;

/// Identifies one cache slot.
///
/// `version` is only set when the same source reports several versions of one
/// name; every other dependency shares a single slot across versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub source_type: SourceType,
    pub name: String,
    pub version: Option<String>,
}

impl CacheKey {
    pub fn new(source_type: SourceType, name: impl Into<String>) -> Self {
        Self {
            source_type,
            name: name.into(),
            version: None,
        }
    }

    pub fn versioned(source_type: SourceType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source_type,
            name: name.into(),
            version: Some(version.into()),
        }
    }

    fn file_stem(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.source_type, self.file_stem())
    }
}

/// `<cache_root>/<type>/<name>.txt`, or `<name>@<version>.txt` for versioned keys.
///
/// Scoped names (`@babel/core`) keep their directory structure. Segments that
/// could escape the cache root (`.`, `..`, empty) become `_`.
pub fn path_for(cache_root: &Path, key: &CacheKey) -> PathBuf {
    let stem = key.file_stem().replace('\\', "_");
    let segments: Vec<&str> = stem.split('/').collect();
    let last = segments.len() - 1;

    let mut path = cache_root.join(key.source_type.as_str());
    for (i, segment) in segments.into_iter().enumerate() {
        let segment = match segment {
            "" | "." | ".." => "_",
            other => other,
        };
        if i == last {
            path.push(format!("{segment}.txt"));
        } else {
            path.push(segment);
        }
    }
    path
}
