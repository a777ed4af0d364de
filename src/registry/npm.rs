use serde_json::Value;

/// `GET /{name}/{version}`. Scoped names are escaped: `@scope/pkg` → `%40scope%2Fpkg`.
pub fn url(name: &str, version: &str) -> String {
    let encoded_name = name.replace('@', "%40").replace('/', "%2F");
    format!("https://registry.npmjs.org/{}/{}", encoded_name, version)
}

/// `"license": "MIT"`, or the legacy `"license": { "type": "MIT" }`.
pub fn extract(data: &Value) -> Option<String> {
    match data.get("license")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
