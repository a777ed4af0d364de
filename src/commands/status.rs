//! Status verification: compare live dependencies against the cache.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::cache::store;
use crate::error::RecordError;
use crate::models::{Dependency, SourceType};
use crate::policy::ReviewPolicy;
use crate::sources;

use super::{for_each_app, AppContext};

pub const MISSING: &str = "cached license data missing";
pub const OUT_OF_DATE: &str = "cached license data out of date";
pub const MISSING_TEXT: &str = "missing license text";

pub fn needs_review(license: &str) -> String {
    format!("license needs reviewed: {license}.")
}

pub fn unreadable(reason: &str) -> String {
    format!("cached license data unreadable: {reason}")
}

/// Warnings for one dependency whose record lives at `path`.
///
/// Reads the cache and nothing else. A missing or unreadable record yields
/// exactly one warning; otherwise every rule that applies is reported.
pub fn verify(path: &Path, dependency: &Dependency, policy: &dyn ReviewPolicy) -> Vec<String> {
    let record = match store::read(path) {
        Ok(record) => record,
        Err(RecordError::NotFound(_)) => return vec![MISSING.to_string()],
        Err(RecordError::Parse { reason, .. }) => return vec![unreadable(&reason)],
        Err(RecordError::Io { source, .. }) => return vec![unreadable(&source.to_string())],
    };

    let mut warnings = Vec::new();
    if record.version != dependency.version {
        warnings.push(OUT_OF_DATE.to_string());
    }
    if record.licenses.is_empty() {
        warnings.push(MISSING_TEXT.to_string());
    }
    if !policy.allowed_or_reviewed(&record) {
        warnings.push(needs_review(&record.license));
    }
    warnings
}

/// One dependency that needs attention.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub source_type: SourceType,
    pub name: String,
    pub version: String,
    /// Where the dependency's record is (or should be) cached.
    pub path: PathBuf,
    pub warnings: Vec<String>,
    /// Problems the adapter hit while resolving the dependency.
    pub errors: Vec<String>,
}

/// Outcome for one application.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub app: String,
    pub checked: usize,
    pub results: Vec<StatusResult>,
    /// Sources that could not enumerate anything for this application.
    pub source_errors: Vec<String>,
}

impl AppStatus {
    pub fn success(&self) -> bool {
        self.results.is_empty() && self.source_errors.is_empty()
    }
}

/// Outcome of a status run across every application, in configuration order.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub apps: Vec<AppStatus>,
}

impl StatusReport {
    pub fn success(&self) -> bool {
        self.apps.iter().all(AppStatus::success)
    }
}

/// Verify every dependency of one application.
#[instrument(skip(ctx), fields(app = %ctx.app.name))]
pub fn check_app(ctx: &AppContext) -> AppStatus {
    let app = &ctx.app;
    let cache = app.cache();
    let mut status = AppStatus {
        app: app.name.clone(),
        checked: 0,
        results: Vec::new(),
        source_errors: Vec::new(),
    };

    for source in ctx.enabled_sources() {
        let keyed = match sources::dependencies(source, &app.source_path, &app.policy) {
            Ok(keyed) => keyed,
            Err(e) => {
                warn!(source = %source.source_type(), error = %e, "source failed");
                status.source_errors.push(e.to_string());
                continue;
            }
        };

        for kd in keyed {
            let path = cache.path_for(&kd.key);
            let warnings = verify(&path, &kd.dependency, &app.policy);
            status.checked += 1;

            if warnings.is_empty() && kd.dependency.errors.is_empty() {
                continue;
            }
            let dep = kd.dependency;
            status.results.push(StatusResult {
                source_type: dep.source_type,
                name: dep.name,
                version: dep.version,
                path,
                warnings,
                errors: dep.errors,
            });
        }
    }

    info!(
        checked = status.checked,
        flagged = status.results.len(),
        "status checked"
    );
    status
}

/// Check every application concurrently.
pub async fn run(contexts: Vec<AppContext>) -> Result<StatusReport> {
    let apps = for_each_app(contexts, |ctx: AppContext| check_app(&ctx)).await?;
    Ok(StatusReport { apps })
}
