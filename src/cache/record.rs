use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CacheWriteError;
use crate::models::{Dependency, LicenseText, SourceType};

const DELIMITER: &str = "---\n";
const HEADER_OPEN: &str = "==> ";
const HEADER_CLOSE: &str = " <== ";

/// Front-matter keys owned by the record itself.
const RESERVED_KEYS: [&str; 4] = ["type", "name", "version", "license"];

/// License data for one dependency as of the last time it was cached.
///
/// On disk a record is a YAML front-matter block followed by one section per
/// license file:
///
/// ```text
/// ---
/// type: cargo
/// name: serde
/// version: 1.0.150
/// license: mit
/// homepage: https://serde.rs
/// ---
/// ==> LICENSE-MIT <== 1071
/// <1071 bytes of text>
/// ```
///
/// Adapter metadata sits beside the fixed keys in the front matter; any key
/// other than `type`, `name`, `version` and `license` belongs to it. Each
/// section header carries the body length in bytes so bodies survive a round
/// trip exactly, whatever they contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub name: String,
    pub version: String,
    /// Normalized license expression, `other` or `none`.
    pub license: String,
    /// Adapter-supplied entries: strings, or lists of strings.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
    #[serde(skip)]
    pub licenses: Vec<LicenseText>,
}

impl CacheRecord {
    pub fn for_dependency(dep: &Dependency, license: String, licenses: Vec<LicenseText>) -> Self {
        Self {
            source_type: dep.source_type,
            name: dep.name.clone(),
            version: dep.version.clone(),
            license,
            metadata: dep
                .metadata
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), serde_yaml::Value::String(value.clone())))
                .collect(),
            licenses,
        }
    }

    fn validate(&self) -> Result<(), CacheWriteError> {
        let invalid = |reason: String| CacheWriteError::Invalid {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("dependency name is empty".into()));
        }
        if let Some(key) = self.metadata.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            return Err(invalid(format!("metadata key `{key}` collides with a record field")));
        }
        for license in &self.licenses {
            if license.sources.is_empty() {
                return Err(invalid("license text has no source file name".into()));
            }
            if license.sources.contains(['\n', '\r']) {
                return Err(invalid(format!(
                    "license file name {:?} contains a line break",
                    license.sources
                )));
            }
        }
        Ok(())
    }

    /// Serialize to the on-disk text format. Fails without side effects on an invalid record.
    pub fn to_text(&self) -> Result<String, CacheWriteError> {
        self.validate()?;

        let yaml = serde_yaml::to_string(self).map_err(|e| CacheWriteError::Invalid {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;

        let mut out = String::with_capacity(
            yaml.len() + self.licenses.iter().map(|l| l.text.len() + 64).sum::<usize>(),
        );
        out.push_str(DELIMITER);
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(DELIMITER);

        for license in &self.licenses {
            out.push_str(HEADER_OPEN);
            out.push_str(&license.sources);
            out.push_str(HEADER_CLOSE);
            out.push_str(&license.text.len().to_string());
            out.push('\n');
            out.push_str(&license.text);
            out.push('\n');
        }

        Ok(out)
    }

    /// Parse the on-disk text format.
    pub fn parse(content: &str) -> Result<Self, String> {
        let rest = content
            .strip_prefix(DELIMITER)
            .ok_or("missing front matter delimiter")?;

        let (front, mut body) = match rest.strip_prefix(DELIMITER) {
            Some(body) => ("", body),
            None => {
                let end = rest
                    .find("\n---\n")
                    .ok_or("unterminated front matter")?;
                (&rest[..=end], &rest[end + 5..])
            }
        };

        let mut record: CacheRecord = serde_yaml::from_str(front).map_err(|e| e.to_string())?;

        while !body.is_empty() {
            let (header, after) = body
                .split_once('\n')
                .ok_or("unterminated license section header")?;
            let header = header
                .strip_prefix(HEADER_OPEN)
                .ok_or_else(|| format!("expected license section header, found {header:?}"))?;
            let (sources, len) = header
                .rsplit_once(HEADER_CLOSE)
                .ok_or_else(|| format!("malformed license section header {header:?}"))?;
            let len: usize = len
                .parse()
                .map_err(|_| format!("invalid license text length {len:?}"))?;

            let text = after
                .get(..len)
                .ok_or_else(|| format!("license text for {sources} is truncated"))?;
            let rest = &after[len..];
            body = match rest.strip_prefix('\n') {
                Some(next) => next,
                None if rest.is_empty() => rest,
                None => return Err(format!("license text for {sources} overruns its length")),
            };

            record.licenses.push(LicenseText {
                sources: sources.to_string(),
                text: text.to_string(),
            });
        }

        Ok(record)
    }
}
