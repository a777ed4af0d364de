use std::fs;
use std::io;
use std::path::Path;

use crate::models::LicenseText;

const LICENSE_FILE_PREFIXES: [&str; 4] = ["license", "licence", "copying", "unlicense"];

/// Read the license files at the top level of a dependency directory,
/// sorted by file name.
pub fn license_files(dir: &Path) -> io::Result<Vec<LicenseText>> {
    let mut texts = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let lower = file_name.to_lowercase();
        if !LICENSE_FILE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            continue;
        }

        let bytes = fs::read(entry.path())?;
        texts.push(LicenseText {
            sources: file_name,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    texts.sort_by(|a, b| a.sources.cmp(&b.sources));
    Ok(texts)
}

/// Identifies a license from raw license texts.
///
/// Real detection is an external concern; the cache only needs an answer.
pub trait LicenseDetector: Send + Sync {
    /// A normalized license id, or `None` if the texts are unrecognized or disagree.
    fn detect(&self, texts: &[LicenseText]) -> Option<String>;
}

/// Recognizes the most common license texts by their distinctive phrases.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseDetector;

impl PhraseDetector {
    fn detect_one(text: &str) -> Option<&'static str> {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let has = |phrase: &str| text.contains(phrase);

        let id = if has("gnu affero general public license") {
            "agpl-3.0"
        } else if has("gnu lesser general public license") {
            if has("version 3") {
                "lgpl-3.0"
            } else {
                "lgpl-2.1"
            }
        } else if has("gnu general public license") {
            if has("version 3") {
                "gpl-3.0"
            } else {
                "gpl-2.0"
            }
        } else if has("apache license") && has("version 2.0") {
            "apache-2.0"
        } else if has("mozilla public license") && has("2.0") {
            "mpl-2.0"
        } else if has("permission is hereby granted, free of charge") {
            "mit"
        } else if has("permission to use, copy, modify, and/or distribute this software for any purpose") {
            "isc"
        } else if has("redistribution and use in source and binary forms") {
            if has("neither the name") || has("names of its contributors may") {
                "bsd-3-clause"
            } else {
                "bsd-2-clause"
            }
        } else if has("this is free and unencumbered software released into the public domain") {
            "unlicense"
        } else {
            return None;
        };
        Some(id)
    }
}

impl LicenseDetector for PhraseDetector {
    fn detect(&self, texts: &[LicenseText]) -> Option<String> {
        let mut found: Option<&'static str> = None;
        for license in texts {
            let id = Self::detect_one(&license.text)?;
            match found {
                Some(prev) if prev != id => return None,
                _ => found = Some(id),
            }
        }
        found.map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MIT: &str = "MIT License\n\nPermission is hereby granted, free of charge, to any person\nobtaining a copy";

    fn text(sources: &str, text: &str) -> LicenseText {
        LicenseText {
            sources: sources.into(),
            text: text.into(),
        }
    }

    #[test]
    fn test_license_files_picks_license_like_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("LICENSE-MIT"), MIT).unwrap();
        fs::write(dir.path().join("COPYING"), "gpl").unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();
        fs::create_dir(dir.path().join("licenses")).unwrap();

        let texts = license_files(dir.path()).unwrap();
        let names: Vec<_> = texts.iter().map(|t| t.sources.as_str()).collect();
        assert_eq!(names, vec!["COPYING", "LICENSE-MIT"]);
        assert_eq!(texts[1].text, MIT);
    }

    #[test]
    fn test_detects_mit() {
        assert_eq!(PhraseDetector.detect(&[text("LICENSE", MIT)]).as_deref(), Some("mit"));
    }

    #[test]
    fn test_lgpl_is_not_mistaken_for_gpl() {
        let lgpl = "GNU LESSER GENERAL PUBLIC LICENSE\nVersion 3, 29 June 2007\n... GNU General Public License ...";
        assert_eq!(PhraseDetector.detect(&[text("COPYING", lgpl)]).as_deref(), Some("lgpl-3.0"));
    }

    #[test]
    fn test_bsd_variants() {
        let two = "Redistribution and use in source and binary forms, with or without modification";
        let three = "Redistribution and use in source and binary forms ... Neither the name of the copyright holder";
        assert_eq!(PhraseDetector.detect(&[text("LICENSE", two)]).as_deref(), Some("bsd-2-clause"));
        assert_eq!(PhraseDetector.detect(&[text("LICENSE", three)]).as_deref(), Some("bsd-3-clause"));
    }

    #[test]
    fn test_disagreeing_or_unknown_texts() {
        let apache = "Apache License\n Version 2.0, January 2004";
        assert_eq!(
            PhraseDetector.detect(&[text("LICENSE-APACHE", apache), text("LICENSE-MIT", MIT)]),
            None
        );
        assert_eq!(PhraseDetector.detect(&[text("LICENSE", "All rights reserved.")]), None);
        assert_eq!(PhraseDetector.detect(&[]), None);
    }
}
