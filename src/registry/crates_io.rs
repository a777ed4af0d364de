use serde_json::Value;

pub fn url(name: &str, version: &str) -> String {
    format!("https://crates.io/api/v1/crates/{}/{}", name, version)
}

/// `GET /api/v1/crates/{name}/{version}` nests the license under `version`.
pub fn extract(data: &Value) -> Option<String> {
    data.pointer("/version/license")
        .and_then(Value::as_str)
        .map(str::to_string)
}
