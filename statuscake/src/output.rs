//! Output formatting: plain text (one `path: value` line per leaf) and JSON.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `data[0].website_name: example` lines
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

/// Flatten `value` into `path: value` lines.
pub fn format_plain(value: &Value) -> String {
    let mut lines = Vec::new();
    flatten(value, String::new(), &mut lines);
    lines.join("\n")
}

fn flatten(value: &Value, prefix: String, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                let path = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten(v, path, lines);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, v) in arr.iter().enumerate() {
                flatten(v, format!("{}[{}]", prefix, i), lines);
            }
        }
        leaf => {
            let rendered = match leaf {
                Value::String(s) => s.clone(),
                Value::Object(_) => "{}".to_string(),
                Value::Array(_) => "[]".to_string(),
                other => other.to_string(),
            };
            if prefix.is_empty() {
                lines.push(rendered);
            } else {
                lines.push(format!("{}: {}", prefix, rendered));
            }
        }
    }
}

/// Format value as JSON (pretty).
pub fn format_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
