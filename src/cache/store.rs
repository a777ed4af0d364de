use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::key::{self, CacheKey};
use crate::cache::record::CacheRecord;
use crate::error::{CacheWriteError, RecordError};

/// A cache directory holding one record file per [`CacheKey`].
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        key::path_for(&self.root, key)
    }
}

/// Load the record stored at `path`.
pub fn read(path: &Path) -> Result<CacheRecord, RecordError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RecordError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(RecordError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    CacheRecord::parse(&content).map_err(|reason| RecordError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Write `record` to `path`, creating parent directories.
///
/// The record is fully serialized before anything touches the disk, then
/// written to a temporary file next to `path` and renamed over it, so a
/// failure at any point leaves the previous file as it was.
pub fn write(path: &Path, record: &CacheRecord) -> Result<(), CacheWriteError> {
    let content = record.to_text()?;

    let io_err = |source: io::Error| CacheWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(content.as_bytes()).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote cache record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LicenseText, SourceType};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn record(version: &str) -> CacheRecord {
        CacheRecord {
            source_type: SourceType::Npm,
            name: "@scope/pkg".into(),
            version: version.into(),
            license: "mit".into(),
            metadata: BTreeMap::new(),
            licenses: vec![LicenseText {
                sources: "LICENSE".into(),
                text: "MIT License\r\n\r\nCopyright (c) 2024\n".into(),
            }],
        }
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let path = store.path_for(&CacheKey::new(SourceType::Npm, "@scope/pkg"));

        write(&path, &record("1.0.0")).unwrap();
        assert!(path.ends_with("npm/@scope/pkg.txt"));
        assert_eq!(read(&path).unwrap(), record("1.0.0"));
    }

    #[test]
    fn test_write_overwrites_previous_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("npm/pkg.txt");

        write(&path, &record("1.0.0")).unwrap();
        write(&path, &record("2.0.0")).unwrap();
        assert_eq!(read(&path).unwrap().version, "2.0.0");
    }

    #[test]
    fn test_invalid_record_leaves_existing_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("npm/pkg.txt");
        write(&path, &record("1.0.0")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let mut bad = record("2.0.0");
        bad.licenses[0].sources = "LICENSE\nX".into();
        assert!(matches!(write(&path, &bad), Err(CacheWriteError::Invalid { .. })));

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        let leftovers = fs::read_dir(dir.path().join("npm")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read(&dir.path().join("cargo/nope.txt")).unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));
    }

    #[test]
    fn test_read_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.txt");
        fs::write(&path, "---\nname: foo\n---\n").unwrap();
        assert!(matches!(read(&path), Err(RecordError::Parse { .. })));
    }
}
