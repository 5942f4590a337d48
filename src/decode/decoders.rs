//! Path helpers for JSON response bodies

use serde_json::Value;

/// Extract the record array at `path`.
///
/// With no path the body itself must be an array. The error is a plain
/// message; callers attach the endpoint.
pub fn extract_records(body: &Value, path: Option<&str>) -> Result<Vec<Value>, String> {
    let target = match path {
        Some(path) => lookup_path(body, path).ok_or_else(|| format!("missing '{path}'"))?,
        None => body.clone(),
    };

    match target {
        Value::Array(records) => Ok(records),
        // An explicit null list is how some endpoints say "nothing yet"
        Value::Null => Ok(Vec::new()),
        other => Err(format!(
            "expected an array at '{}', found {}",
            path.unwrap_or("$"),
            type_name(&other)
        )),
    }
}

/// Look up a dot-notation path such as `meta.next` or `data[0].id`.
///
/// Negative indices count from the end of an array.
pub fn lookup_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            let idx = if index < 0 {
                arr.len().checked_sub(index.unsigned_abs() as usize)?
            } else {
                index as usize
            };
            current = arr.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
