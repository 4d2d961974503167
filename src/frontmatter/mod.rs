//! YAML frontmatter envelope shared by every session file.
//!
//! A file is `---\n<yaml>---\n<body>`. Parsing never fails: content without
//! the envelope, or with YAML that does not decode to a mapping, comes back
//! as an empty mapping so a single damaged header cannot block reads.

use serde_yaml::{Mapping, Value};
use tracing::warn;

const DELIMITER: &str = "---\n";
const CLOSING: &str = "\n---\n";

/// Split `content` into its frontmatter mapping and body text.
pub fn parse(content: &str) -> (Mapping, String) {
    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return (Mapping::new(), content.to_string());
    };
    let Some(end) = rest.find(CLOSING) else {
        return (Mapping::new(), content.to_string());
    };

    // Keep the header's last newline; block scalars are clipped without it.
    let yaml = &rest[..end + 1];
    let body = &rest[end + CLOSING.len()..];

    let fields = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => map,
        Ok(Value::Null) => Mapping::new(),
        Ok(other) => {
            warn!("frontmatter is not a mapping (found {}), ignoring", kind(&other));
            Mapping::new()
        }
        Err(e) => {
            warn!("failed to parse YAML frontmatter: {e}");
            Mapping::new()
        }
    };

    (fields, body.to_string())
}

/// Render `fields` and `body` back into a session file.
///
/// Keys are emitted in insertion order.
pub fn serialize(fields: &Mapping, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(fields)?;
    Ok(format!("{DELIMITER}{yaml}{DELIMITER}{body}"))
}

// ---------------------------------------------------------------
// Field accessors
// ---------------------------------------------------------------

/// Scalar value of `key` rendered as text. Timestamps written by other
/// tools may come back as non-string scalars.
pub fn get_text(fields: &Mapping, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Set `key` to a string, keeping its position if it already exists.
pub fn set_str(fields: &mut Mapping, key: &str, value: &str) {
    fields.insert(Value::from(key), Value::from(value));
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests;
