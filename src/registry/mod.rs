//! Async lookups of declared licenses from upstream package registries.
//!
//! Each registry module knows its URL layout and where the license lives in
//! the JSON it returns; the HTTP round trip is shared. Lookups answer
//! `Ok(Some(license))` when found, `Ok(None)` when the package is unknown or
//! declares nothing, and `Err` on network failures.

pub mod crates_io;
pub mod npm;
pub mod pypi;

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::models::SourceType;

const USER_AGENT: &str = concat!("license-cache/", env!("CARGO_PKG_VERSION"), " (license compliance tool)");

/// Ask the registry behind `source_type` for the license of `name@version`.
pub async fn fetch_license(
    client: &Client,
    source_type: SourceType,
    name: &str,
    version: &str,
) -> Result<Option<String>> {
    let (url, extract): (String, fn(&Value) -> Option<String>) = match source_type {
        SourceType::Cargo => (crates_io::url(name, version), crates_io::extract),
        SourceType::Npm | SourceType::Yarn => (npm::url(name, version), npm::extract),
        SourceType::Pip => (pypi::url(name, version), pypi::extract),
        SourceType::Swift => return Ok(None),
    };

    let response = client
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        debug!(%url, status = %response.status(), "registry has no entry");
        return Ok(None);
    }

    let data: Value = response.json().await?;
    Ok(extract(&data).filter(|l| !l.trim().is_empty()))
}
