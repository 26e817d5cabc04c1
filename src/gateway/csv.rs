//! Loki query result → CSV conversion.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Header row of every export.
pub const CSV_HEADER: &str = "timestamp,line,stream";

/// Body of a Loki `query_range` response. Only the parts needed for export.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogQueryResult {
    pub data: Option<QueryData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryData {
    pub result: Vec<LogStream>,
}

/// One stream: its label set, in the order the backend sent it, and
/// `[timestamp, line, ...]` entries.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogStream {
    pub stream: Map<String, Value>,
    pub values: Vec<Vec<Value>>,
}

impl LogStream {
    /// Labels as `key=value` pairs joined by `;`. Null values render empty.
    pub fn label_string(&self) -> String {
        self.stream
            .iter()
            .map(|(k, v)| format!("{}={}", k, scalar_text(v)))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Parse a backend body and render it as CSV.
pub fn loki_json_to_csv(body: &[u8]) -> Result<String, serde_json::Error> {
    let parsed: LogQueryResult = serde_json::from_slice(body)?;
    Ok(render_csv(&parsed))
}

pub fn render_csv(result: &LogQueryResult) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    let streams = result.data.as_ref().map(|d| d.result.as_slice()).unwrap_or_default();
    for stream in streams {
        let labels = escape_field(&stream.label_string());
        for entry in &stream.values {
            let ts = entry.first().map(scalar_text).unwrap_or_default();
            let line = entry.get(1).map(scalar_text).unwrap_or_default();

            out.push_str(&ts);
            out.push(',');
            out.push_str(&escape_field(&line));
            out.push(',');
            out.push_str(&labels);
            out.push('\n');
        }
    }

    out
}

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
