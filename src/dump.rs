//! Plain-text record rendering.

use reelmeta_common::{ratings, Record, Value};
use std::io::{self, Write};

/// Write a record as `key: value` lines in field order. Vector fields emit
/// one line per element; canonical rating integers render through their
/// display strings.
pub fn dump<W: Write>(out: &mut W, record: &Record) -> io::Result<()> {
    for (key, value) in record.iter() {
        match value {
            Value::List(items) => {
                for item in items {
                    writeln!(out, "{key}: {item}")?;
                }
            }
            Value::Int(n) => {
                let shown = ratings::Kind::for_field(key)
                    .and_then(|kind| ratings::display_known(kind, *n));
                match shown {
                    Some(text) => writeln!(out, "{key}: {text}")?,
                    None => writeln!(out, "{key}: {n}")?,
                }
            }
            Value::Text(text) => writeln!(out, "{key}: {text}")?,
        }
    }
    Ok(())
}

/// Render a record as a JSON object, keeping field order.
pub fn to_json(record: &Record) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, value) in record.iter() {
        if let Ok(value) = serde_json::to_value(value) {
            map.insert(key.to_string(), value);
        }
    }
    serde_json::Value::Object(map)
}
