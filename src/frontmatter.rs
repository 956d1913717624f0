//! YAML front matter extraction.
//!
//! A document may start with a block delimited by `---` lines. The block is
//! parsed with serde_yaml and converted to JSON values so the corpus reads
//! fields with one uniform API. Everything after the closing delimiter is the
//! body handed to pandoc.

use serde_json::Value;
use std::collections::BTreeMap;

pub type Fields = BTreeMap<String, Value>;

/// Split `input` into front matter fields and body.
///
/// Returns empty fields and the whole input when there is no block, or when
/// the opening `---` is never closed. An empty block yields empty fields.
/// Malformed YAML, or YAML that is not a mapping, is an error.
pub fn split(input: &str) -> Result<(Fields, &str), serde_yaml::Error> {
    let text = input.trim_start_matches('\u{feff}');
    let Some(after_open) = strip_delimiter_line(text) else {
        return Ok((Fields::new(), input));
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok((parse_yaml_to_json_map(yaml)?, body));
        }
        offset += line.len();
    }
    Ok((Fields::new(), input))
}

/// The rest of `text` after a first line consisting of `---`.
fn strip_delimiter_line(text: &str) -> Option<&str> {
    let (first, rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };
    (first.trim_end() == "---").then_some(rest)
}

fn parse_yaml_to_json_map(yaml: &str) -> Result<Fields, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(Fields::new());
    }
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    match yaml_value {
        serde_yaml::Value::Null => Ok(Fields::new()),
        serde_yaml::Value::Mapping(_) => {
            // Mappings with non-string keys fail here.
            serde_yaml::from_value(yaml_value)
        }
        _ => Err(serde::de::Error::custom("front matter must be a mapping")),
    }
}

/// String value of `key`, numbers and booleans rendered as text.
pub fn string_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Labels from `categories` (list or space-separated string) and `category`.
///
/// Order of first appearance is kept and duplicates are dropped.
pub fn categories(fields: &Fields) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut push = |label: &str| {
        let label = label.trim();
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    };

    match fields.get("categories") {
        Some(Value::String(s)) => s.split_whitespace().for_each(&mut push),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) => push(s),
                    Value::Number(n) => push(&n.to_string()),
                    _ => {}
                }
            }
        }
        _ => {}
    }
    if let Some(label) = string_field(fields, "category") {
        push(&label);
    }
    labels
}
