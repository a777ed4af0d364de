use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::instrument;

use crate::error::SourceError;
use crate::models::{Dependency, SourceType};

use super::shell;

/// Swift packages pinned in `Package.resolved`, checked out under `.build/checkouts`.
pub struct SwiftSource;

impl SwiftSource {
    pub fn new() -> Self {
        Self
    }
}

impl super::Source for SwiftSource {
    fn source_type(&self) -> SourceType {
        SourceType::Swift
    }

    fn enabled(&self, root: &Path) -> bool {
        root.join("Package.resolved").exists() && shell::success(root, "swift", &["package", "describe"])
    }

    #[instrument(skip(self))]
    fn enumerate_dependencies(&self, root: &Path) -> Result<Vec<Dependency>, SourceError> {
        let resolved_path = root.join("Package.resolved");
        let content = std::fs::read_to_string(&resolved_path).map_err(|e| SourceError::Manifest {
            source_type: SourceType::Swift,
            path: resolved_path.clone(),
            reason: e.to_string(),
        })?;

        parse_package_resolved(&content, root).map_err(|reason| SourceError::Manifest {
            source_type: SourceType::Swift,
            path: resolved_path,
            reason,
        })
    }
}

/// Parse `Package.resolved` v1 (`object.pins`) or v2+ (`pins`).
fn parse_package_resolved(content: &str, root: &Path) -> Result<Vec<Dependency>, String> {
    let json: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let (pins, name_key, url_key) = match json.pointer("/object/pins") {
        Some(pins) => (pins, "package", "repositoryURL"),
        None => (
            json.get("pins").ok_or("no `pins` list")?,
            "identity",
            "location",
        ),
    };
    let pins = pins.as_array().ok_or("`pins` is not a list")?;

    let deps = pins
        .iter()
        .map(|pin| {
            let name = pin.get(name_key).and_then(Value::as_str);
            let version = pin
                .pointer("/state/version")
                .and_then(Value::as_str)
                .or_else(|| pin.pointer("/state/revision").and_then(Value::as_str));
            let url = pin.get(url_key).and_then(Value::as_str);

            let mut dep = Dependency::new(
                SourceType::Swift,
                name.unwrap_or_default(),
                version.unwrap_or_default(),
            );
            if name.is_none() {
                dep = dep.with_error(format!("pin is missing `{name_key}`"));
            }
            if version.is_none() {
                dep = dep.with_error("pin has no version or revision");
            }
            match url.and_then(checkout_name) {
                Some(checkout) => {
                    dep = dep
                        .with_path(checkout_path(root, &checkout))
                        .with_metadata("homepage", url);
                }
                None => dep = dep.with_error(format!("pin has no usable `{url_key}`")),
            }
            dep
        })
        .collect();

    Ok(deps)
}

/// Last path component of a repository URL, without `.git`.
fn checkout_name(url: &str) -> Option<String> {
    let last = url.trim_end_matches('/').rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}

fn checkout_path(root: &Path, checkout: &str) -> PathBuf {
    root.join(".build").join("checkouts").join(checkout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1: &str = r#"{
  "object": {
    "pins": [
      {
        "package": "Alamofire",
        "repositoryURL": "https://github.com/Alamofire/Alamofire.git",
        "state": { "branch": null, "revision": "abc", "version": "5.6.4" }
      },
      {
        "package": "Nimble",
        "repositoryURL": "git@github.com:Quick/Nimble.git",
        "state": { "branch": "main", "revision": "def123", "version": null }
      }
    ]
  },
  "version": 1
}"#;

    const V2: &str = r#"{
  "pins": [
    {
      "identity": "swift-argument-parser",
      "kind": "remoteSourceControl",
      "location": "https://github.com/apple/swift-argument-parser",
      "state": { "revision": "fee6933", "version": "1.2.3" }
    },
    {
      "identity": "broken",
      "state": { "version": "0.1.0" }
    }
  ],
  "version": 2
}"#;

    #[test]
    fn test_parse_v1() {
        let root = Path::new("/project");
        let deps = parse_package_resolved(V1, root).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "Alamofire");
        assert_eq!(deps[0].version, "5.6.4");
        assert_eq!(
            deps[0].path.as_deref(),
            Some(Path::new("/project/.build/checkouts/Alamofire"))
        );
        assert_eq!(deps[1].version, "def123");
        assert_eq!(
            deps[1].path.as_deref(),
            Some(Path::new("/project/.build/checkouts/Nimble"))
        );
        assert!(deps.iter().all(|d| d.errors.is_empty()));
    }

    #[test]
    fn test_parse_v2_with_bad_pin() {
        let deps = parse_package_resolved(V2, Path::new("/p")).unwrap();
        assert_eq!(deps[0].name, "swift-argument-parser");
        assert_eq!(
            deps[0].path.as_deref(),
            Some(Path::new("/p/.build/checkouts/swift-argument-parser"))
        );
        assert_eq!(deps[1].name, "broken");
        assert_eq!(deps[1].path, None);
        assert_eq!(deps[1].errors.len(), 1);
    }

    #[test]
    fn test_unreadable_resolved_file() {
        assert!(parse_package_resolved("{", Path::new("/p")).is_err());
        assert!(parse_package_resolved(r#"{ "version": 2 }"#, Path::new("/p")).is_err());
    }

    #[test]
    fn test_checkout_name() {
        assert_eq!(checkout_name("https://github.com/a/b.git").as_deref(), Some("b"));
        assert_eq!(checkout_name("https://github.com/a/b/").as_deref(), Some("b"));
        assert_eq!(checkout_name("git@github.com:a.git").as_deref(), Some("a"));
        assert_eq!(checkout_name(""), None);
    }
}
