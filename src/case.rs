//! Key conversion for backup export: DB column names (snake_case) -> JSON keys (camelCase).

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "user_name" -> "userName", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Two distinct source columns mapped to the same camelCase key.
#[derive(Debug)]
pub struct KeyCollision {
    pub first: String,
    pub second: String,
    pub key: String,
}

/// Rebuild a row object with camelCase keys, keeping column order.
/// A collision is an error: a backup must not silently drop a column.
pub fn row_keys_to_camel_case(obj: Map<String, Value>) -> Result<Map<String, Value>, KeyCollision> {
    let mut out = Map::with_capacity(obj.len());
    let mut sources: HashMap<String, String> = HashMap::with_capacity(obj.len());
    for (k, v) in obj {
        let camel = to_camel_case(&k);
        if let Some(first) = sources.get(&camel) {
            return Err(KeyCollision {
                first: first.clone(),
                second: k,
                key: camel,
            });
        }
        sources.insert(camel.clone(), k);
        out.insert(camel, v);
    }
    Ok(out)
}
