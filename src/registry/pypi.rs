use serde_json::Value;

const CLASSIFIER_PREFIX: &str = "License :: OSI Approved :: ";

pub fn url(name: &str, version: &str) -> String {
    format!("https://pypi.org/pypi/{}/{}/json", name, version)
}

/// `info.license`, falling back to the first `License :: OSI Approved ::`
/// trove classifier when the field is empty.
pub fn extract(data: &Value) -> Option<String> {
    let info = data.get("info")?;
    let declared = info
        .get("license")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() < 100);
    if let Some(license) = declared {
        return Some(license.to_string());
    }

    info.get("classifiers")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .find_map(|c| c.strip_prefix(CLASSIFIER_PREFIX))
        .map(str::to_string)
}
