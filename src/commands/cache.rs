//! Writing and refreshing cache records.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{store, CacheRecord};
use crate::license::detector::{license_files, LicenseDetector, PhraseDetector};
use crate::license::spdx::normalize;
use crate::models::{Dependency, SourceType};
use crate::registry;
use crate::sources;

use super::{for_each_app, AppContext};

const BATCH_SIZE: usize = 75;

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Rewrite records even when the cached version is current.
    pub force: bool,
    /// Ask package registries for licenses nothing local could identify.
    pub online: bool,
    /// Show a progress bar during registry lookups.
    pub progress: bool,
}

/// A record that could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct CacheFailure {
    pub source_type: SourceType,
    pub name: String,
    pub version: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppCacheSummary {
    pub app: String,
    pub cache_path: PathBuf,
    /// Records written this run.
    pub cached: usize,
    /// Records left alone because their version was current.
    pub reused: usize,
    pub failures: Vec<CacheFailure>,
    pub source_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub apps: Vec<AppCacheSummary>,
}

impl CacheReport {
    pub fn success(&self) -> bool {
        self.apps
            .iter()
            .all(|a| a.failures.is_empty() && a.source_errors.is_empty())
    }
}

/// A record waiting to be written.
struct Pending {
    path: PathBuf,
    record: CacheRecord,
    /// The license came from the dependency itself rather than a fallback.
    identified: bool,
}

struct AppPlan {
    summary: AppCacheSummary,
    pending: Vec<Pending>,
}

/// Build the record for `dep` from its metadata and license files.
///
/// The license is the declared one, else whatever `detector` recognizes in
/// the texts, else `other` when texts exist and `none` when they do not.
fn build_record(dep: &Dependency, detector: &dyn LicenseDetector) -> (CacheRecord, bool) {
    let texts = match &dep.path {
        Some(path) => license_files(path).unwrap_or_else(|e| {
            warn!(name = %dep.name, path = %path.display(), error = %e, "unable to read license files");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let license = dep
        .metadata
        .get("license")
        .and_then(|l| normalize(l))
        .or_else(|| detector.detect(&texts));
    let identified = license.is_some();
    let license = license.unwrap_or_else(|| fallback_license(!texts.is_empty()).to_string());

    (CacheRecord::for_dependency(dep, license, texts), identified)
}

fn fallback_license(has_texts: bool) -> &'static str {
    if has_texts {
        "other"
    } else {
        "none"
    }
}

#[instrument(skip(ctx, detector), fields(app = %ctx.app.name))]
fn plan_app(ctx: &AppContext, detector: &dyn LicenseDetector, force: bool) -> AppPlan {
    let app = &ctx.app;
    let cache = app.cache();
    let mut plan = AppPlan {
        summary: AppCacheSummary {
            app: app.name.clone(),
            cache_path: app.cache_path.clone(),
            cached: 0,
            reused: 0,
            failures: Vec::new(),
            source_errors: Vec::new(),
        },
        pending: Vec::new(),
    };

    for source in ctx.enabled_sources() {
        let keyed = match sources::dependencies(source, &app.source_path, &app.policy) {
            Ok(keyed) => keyed,
            Err(e) => {
                warn!(source = %source.source_type(), error = %e, "source failed");
                plan.summary.source_errors.push(e.to_string());
                continue;
            }
        };

        for kd in keyed {
            let path = cache.path_for(&kd.key);
            let dep = &kd.dependency;
            for error in &dep.errors {
                warn!(key = %kd.key, %error, "dependency resolution error");
            }

            if !force {
                if let Ok(existing) = store::read(&path) {
                    if existing.version == dep.version {
                        debug!(key = %kd.key, "cached record is current");
                        plan.summary.reused += 1;
                        continue;
                    }
                }
            }

            let (record, identified) = build_record(dep, detector);
            plan.pending.push(Pending {
                path,
                record,
                identified,
            });
        }
    }

    plan
}

fn write_app(plan: AppPlan) -> AppCacheSummary {
    let mut summary = plan.summary;
    for pending in plan.pending {
        match store::write(&pending.path, &pending.record) {
            Ok(()) => summary.cached += 1,
            Err(e) => {
                warn!(error = %e, "failed to cache record");
                summary.failures.push(CacheFailure {
                    source_type: pending.record.source_type,
                    name: pending.record.name,
                    version: pending.record.version,
                    reason: e.to_string(),
                });
            }
        }
    }
    info!(
        app = %summary.app,
        cached = summary.cached,
        reused = summary.reused,
        failed = summary.failures.len(),
        "cache updated"
    );
    summary
}

/// Fill in licenses for unidentified records from package registries.
async fn enrich_online(plans: &mut [AppPlan], progress: bool) -> Result<()> {
    let mut unidentified: Vec<&mut Pending> = plans
        .iter_mut()
        .flat_map(|p| p.pending.iter_mut())
        .filter(|p| !p.identified)
        .collect();
    if unidentified.is_empty() {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let pb = if progress {
        let pb = ProgressBar::new(unidentified.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    for batch in unidentified.chunks_mut(BATCH_SIZE) {
        let lookups: Vec<_> = batch
            .iter()
            .map(|p| {
                registry::fetch_license(&client, p.record.source_type, &p.record.name, &p.record.version)
            })
            .collect();
        let results = join_all(lookups).await;

        for (pending, result) in batch.iter_mut().zip(results) {
            match result {
                Ok(Some(license)) => {
                    if let Some(license) = normalize(&license) {
                        pending.record.license = license;
                        pending.identified = true;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(name = %pending.record.name, error = %e, "registry lookup failed"),
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    Ok(())
}

/// Cache every application's dependencies.
pub async fn run(contexts: Vec<AppContext>, options: CacheOptions) -> Result<CacheReport> {
    let force = options.force;
    let mut plans = for_each_app(contexts, move |ctx: AppContext| {
        plan_app(&ctx, &PhraseDetector, force)
    })
    .await?;

    if options.online {
        enrich_online(&mut plans, options.progress).await?;
    }

    let apps = for_each_app(plans, write_app).await?;
    Ok(CacheReport { apps })
}
