//! Listing what each source enumerates, without touching the cache.

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::sources::{self, KeyedDependency};

use super::{for_each_app, AppContext};

#[derive(Debug, Clone, Serialize)]
pub struct AppListing {
    pub app: String,
    pub dependencies: Vec<KeyedDependency>,
    pub source_errors: Vec<String>,
}

pub fn list_app(ctx: &AppContext) -> AppListing {
    let app = &ctx.app;
    let mut listing = AppListing {
        app: app.name.clone(),
        dependencies: Vec::new(),
        source_errors: Vec::new(),
    };

    for source in ctx.enabled_sources() {
        match sources::dependencies(source, &app.source_path, &app.policy) {
            Ok(keyed) => listing.dependencies.extend(keyed),
            Err(e) => {
                warn!(app = %app.name, source = %source.source_type(), error = %e, "source failed");
                listing.source_errors.push(e.to_string());
            }
        }
    }
    listing
}

pub async fn run(contexts: Vec<AppContext>) -> Result<Vec<AppListing>> {
    for_each_app(contexts, |ctx: AppContext| list_app(&ctx)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::app;
    use crate::models::{Dependency, SourceType};
    use crate::sources::testing::StaticSource;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_every_enabled_source() {
        let dir = TempDir::new().unwrap();
        let ctx = AppContext::new(
            app("web", dir.path(), &["mit"]),
            vec![
                Box::new(StaticSource::new(
                    SourceType::Npm,
                    vec![
                        Dependency::new(SourceType::Npm, "lodash", "3.10.1"),
                        Dependency::new(SourceType::Npm, "lodash", "4.17.21"),
                    ],
                )),
                Box::new(StaticSource::failing(SourceType::Pip, "bad Pipfile.lock")),
            ],
        );

        let listings = run(vec![ctx]).await.unwrap();
        assert_eq!(listings.len(), 1);
        let keys: Vec<String> = listings[0].dependencies.iter().map(|d| d.key.to_string()).collect();
        assert_eq!(keys, vec!["npm/lodash@3.10.1", "npm/lodash@4.17.21"]);
        assert_eq!(listings[0].source_errors.len(), 1);
        assert!(!dir.path().join(".licenses").exists());
    }
}
