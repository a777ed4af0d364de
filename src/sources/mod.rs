//! Package ecosystem adapters.
//!
//! Each adapter implements [`Source`]; everything downstream (status checks,
//! caching, listing) only sees the trait and the [`KeyedDependency`] values
//! produced by [`dependencies`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::cache::CacheKey;
use crate::error::SourceError;
use crate::models::{Dependency, SourceType};
use crate::policy::Policy;

pub mod cargo;
pub mod npm;
pub mod pip;
pub mod shell;
pub mod swift;
pub mod yarn;

pub trait Source: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Whether this ecosystem applies to the project rooted at `root`.
    fn enabled(&self, root: &Path) -> bool;

    /// List the project's dependencies.
    ///
    /// A problem with one dependency is recorded in its `errors`; only a
    /// manifest or tool failure that prevents listing anything is an `Err`.
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError>;
}

/// Every built-in adapter.
pub fn all() -> Vec<Box<dyn Source>> {
    vec![
        Box::new(cargo::CargoSource::new()),
        Box::new(npm::NpmSource::new()),
        Box::new(pip::PipSource::new()),
        Box::new(swift::SwiftSource::new()),
        Box::new(yarn::YarnSource::new()),
    ]
}

/// A dependency paired with the cache slot it maps to.
#[derive(Debug, Clone, Serialize)]
pub struct KeyedDependency {
    pub key: CacheKey,
    pub dependency: Dependency,
}

/// Enumerate `source` for the project at `root`, drop ignored dependencies and
/// assign cache keys.
#[instrument(skip(source, policy), fields(source = %source.source_type()))]
pub fn dependencies(
    source: &dyn Source,
    root: &Path,
    policy: &Policy,
) -> Result<Vec<KeyedDependency>, SourceError> {
    let source_type = source.source_type();
    let found = source.enumerate_dependencies(root)?;
    let total = found.len();

    let kept: Vec<Dependency> = found
        .into_iter()
        .filter(|d| !policy.ignored(source_type, &d.name))
        .collect();
    debug!(total, ignored = total - kept.len(), "enumerated dependencies");

    Ok(assign_keys(source_type, kept))
}

/// Collapse exact `(name, version)` duplicates to their last occurrence, then
/// key each dependency by name, or by name and version when one source
/// reports several versions of the same name.
pub fn assign_keys(source_type: SourceType, deps: Vec<Dependency>) -> Vec<KeyedDependency> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Dependency> = deps
        .into_iter()
        .rev()
        .filter(|d| seen.insert((d.name.clone(), d.version.clone())))
        .collect();
    unique.reverse();

    let mut versions: HashMap<&str, usize> = HashMap::new();
    for dep in &unique {
        *versions.entry(dep.name.as_str()).or_insert(0) += 1;
    }
    let multi: HashSet<String> = versions
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();

    unique
        .into_iter()
        .map(|dependency| {
            let key = if multi.contains(&dependency.name) {
                CacheKey::versioned(source_type, &dependency.name, &dependency.version)
            } else {
                CacheKey::new(source_type, &dependency.name)
            };
            KeyedDependency { key, dependency }
        })
        .collect()
}
