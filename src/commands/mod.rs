//! Top-level operations run against every configured application.
//!
//! - [`status`] — verify cached records against the live dependency set.
//! - [`cache`] — write or refresh cached records.
//! - [`list`] — show what each source enumerates.

pub mod cache;
pub mod list;
pub mod status;

use anyhow::{Context, Result};
use futures::future::join_all;

use crate::config::AppConfig;
use crate::sources::{self, Source};

/// One application together with the adapters it may use.
pub struct AppContext {
    pub app: AppConfig,
    pub sources: Vec<Box<dyn Source>>,
}

impl AppContext {
    pub fn new(app: AppConfig, sources: Vec<Box<dyn Source>>) -> Self {
        Self { app, sources }
    }

    /// Build a context per application with every built-in adapter.
    pub fn for_apps(apps: Vec<AppConfig>) -> Vec<AppContext> {
        apps.into_iter().map(|app| Self::new(app, sources::all())).collect()
    }

    /// Adapters switched on in the configuration whose ecosystem is present
    /// under the application's source path.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| self.app.source_enabled(s.source_type()) && s.enabled(&self.app.source_path))
    }
}

/// Run `f` for every per-application item on the blocking pool. Results keep
/// the order of `items`.
pub(crate) async fn for_each_app<I, T, F>(items: Vec<I>, f: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> T + Send + Sync + Clone + 'static,
{
    let handles = items.into_iter().map(|item| {
        let f = f.clone();
        tokio::task::spawn_blocking(move || f(item))
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|r| r.context("application task panicked"))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::path::Path;

    use crate::config::AppConfig;
    use crate::policy::Policy;

    pub fn app(name: &str, root: &Path, allowed: &[&str]) -> AppConfig {
        AppConfig {
            name: name.to_string(),
            source_path: root.to_path_buf(),
            cache_path: root.join(".licenses"),
            sources: HashMap::new(),
            policy: Policy::new(allowed.iter().copied(), HashMap::new(), HashMap::new()),
        }
    }
}
