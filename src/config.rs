use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::cache::CacheStore;
use crate::models::SourceType;
use crate::policy::{Policy, DEFAULT_ALLOWED};

const DEFAULT_CACHE_DIR: &str = ".licenses";

/// Root configuration, deserialized from `.license-cache/config.toml`.
///
/// Every key except `apps` is a default for all applications; an `[[apps]]`
/// entry overrides whichever keys it sets.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub defaults: AppSettings,
    #[serde(default)]
    pub apps: Vec<AppSettings>,
}

/// Settings shared by the root table and each `[[apps]]` entry.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AppSettings {
    pub name: Option<String>,
    /// Project directory the sources enumerate, relative to the config root.
    pub source_path: Option<PathBuf>,
    /// Cache directory, relative to the config root.
    pub cache_path: Option<PathBuf>,
    /// Per-source toggles keyed by source type (`cargo = false`).
    pub sources: Option<HashMap<String, bool>>,
    /// License ids that pass without review.
    pub allowed: Option<Vec<String>>,
    /// Dependency names accepted after review, keyed by source type.
    pub reviewed: Option<HashMap<String, Vec<String>>>,
    /// Dependency names excluded from checks and caching, keyed by source type.
    pub ignored: Option<HashMap<String, Vec<String>>>,
}

impl AppSettings {
    fn merged_over(&self, defaults: &AppSettings) -> AppSettings {
        AppSettings {
            name: self.name.clone().or_else(|| defaults.name.clone()),
            source_path: self.source_path.clone().or_else(|| defaults.source_path.clone()),
            cache_path: self.cache_path.clone(),
            sources: self.sources.clone().or_else(|| defaults.sources.clone()),
            allowed: self.allowed.clone().or_else(|| defaults.allowed.clone()),
            reviewed: self.reviewed.clone().or_else(|| defaults.reviewed.clone()),
            ignored: self.ignored.clone().or_else(|| defaults.ignored.clone()),
        }
    }
}

/// A fully resolved application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub source_path: PathBuf,
    pub cache_path: PathBuf,
    pub sources: HashMap<SourceType, bool>,
    pub policy: Policy,
}

impl AppConfig {
    /// If any source is explicitly enabled only those run; otherwise every
    /// source not explicitly disabled does.
    pub fn source_enabled(&self, source_type: SourceType) -> bool {
        if self.sources.values().any(|enabled| *enabled) {
            self.sources.get(&source_type).copied().unwrap_or(false)
        } else {
            self.sources.get(&source_type).copied().unwrap_or(true)
        }
    }

    pub fn cache(&self) -> CacheStore {
        CacheStore::new(&self.cache_path)
    }
}

impl Config {
    /// Resolve every application. Relative paths are anchored at `root`.
    pub fn apps(&self, root: &Path) -> Result<Vec<AppConfig>> {
        let root_cache = root.join(
            self.defaults
                .cache_path
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_CACHE_DIR)),
        );

        if self.apps.is_empty() {
            let mut settings = self.defaults.clone();
            settings.cache_path = Some(root_cache);
            return Ok(vec![resolve_app(&settings, root)?]);
        }

        let mut apps = Vec::with_capacity(self.apps.len());
        for app in &self.apps {
            let mut settings = app.merged_over(&self.defaults);
            if settings.cache_path.is_none() {
                let name = settings
                    .name
                    .clone()
                    .unwrap_or_else(|| app_name(&resolve_path(root, settings.source_path.as_deref())));
                settings.cache_path = Some(root_cache.join(name));
            }
            apps.push(resolve_app(&settings, root)?);
        }

        let mut names = std::collections::HashSet::new();
        for app in &apps {
            if !names.insert(app.name.as_str()) {
                bail!("duplicate application name `{}`", app.name);
            }
        }
        Ok(apps)
    }
}

fn resolve_path(root: &Path, path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) => root.join(path),
        None => root.to_path_buf(),
    }
}

fn app_name(source_path: &Path) -> String {
    source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
}

fn resolve_app(settings: &AppSettings, root: &Path) -> Result<AppConfig> {
    let source_path = resolve_path(root, settings.source_path.as_deref());
    let cache_path = resolve_path(root, settings.cache_path.as_deref());
    let name = settings.name.clone().unwrap_or_else(|| app_name(&source_path));

    let sources = settings
        .sources
        .iter()
        .flatten()
        .map(|(key, enabled)| Ok((parse_source_type(key)?, *enabled)))
        .collect::<Result<HashMap<_, _>>>()?;

    let allowed: Vec<String> = match &settings.allowed {
        Some(allowed) => allowed.clone(),
        None => DEFAULT_ALLOWED.iter().map(|s| s.to_string()).collect(),
    };

    let policy = Policy::new(
        allowed,
        by_source_type(settings.reviewed.as_ref())?,
        by_source_type(settings.ignored.as_ref())?,
    );

    Ok(AppConfig {
        name,
        source_path,
        cache_path,
        sources,
        policy,
    })
}

fn parse_source_type(key: &str) -> Result<SourceType> {
    key.parse::<SourceType>()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")
}

fn by_source_type(lists: Option<&HashMap<String, Vec<String>>>) -> Result<HashMap<SourceType, Vec<String>>> {
    lists
        .into_iter()
        .flatten()
        .map(|(key, names)| Ok((parse_source_type(key)?, names.clone())))
        .collect()
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.license-cache/config.toml`
/// 3. `~/.config/license-cache/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-cache").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("license-cache").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}
