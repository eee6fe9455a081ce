//! Bracket-syntax parameter decoding: `ids[]=1`, `user[name]=ann`,
//! `items[][id]=1`.

use serde_json::Value;

use super::Parameters;

/// Decode `pairs` in order into a nested parameter map.
pub fn decode<I>(pairs: I) -> Parameters
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut params = Parameters::new();
    for (key, value) in pairs {
        insert(&mut params, &key, Value::String(value));
    }
    params
}

/// Store `value` under the bracketed `key`.
///
/// `a[]` appends to an array, `a[b]` descends into an object and `a[][b]`
/// fills the last object of an array until it already holds `b`. A plain
/// key, or one whose brackets do not parse, is stored as is and the last
/// value wins.
pub fn insert(params: &mut Parameters, key: &str, value: Value) {
    let (name, rest) = split_key(key);
    if rest.is_empty() {
        params.insert(name.to_string(), value);
        return;
    }

    if let Some(after) = rest.strip_prefix("[]") {
        if after.is_empty() {
            with_array(params, name, |items| items.push(value));
            return;
        }
        if let Some(child) = bracket_child(after) {
            let (child_name, _) = split_key(&child);
            with_array(params, name, |items| {
                let starts_new = match items.last() {
                    Some(Value::Object(last)) => last.contains_key(child_name),
                    _ => true,
                };
                if starts_new {
                    items.push(Value::Object(Parameters::new()));
                }
                if let Some(Value::Object(last)) = items.last_mut() {
                    insert(last, &child, value);
                }
            });
            return;
        }
    } else if let Some(child) = bracket_child(rest) {
        with_object(params, name, |object| insert(object, &child, value));
        return;
    }

    params.insert(key.to_string(), value);
}

fn split_key(key: &str) -> (&str, &str) {
    match key.find('[') {
        Some(index) if index > 0 => key.split_at(index),
        _ => (key, ""),
    }
}

/// `[b][c]` -> `b[c]`, `[b]` -> `b`.
fn bracket_child(rest: &str) -> Option<String> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    let (head, tail) = (&inner[..close], &inner[close + 1..]);
    if head.is_empty() || !(tail.is_empty() || tail.starts_with('[')) {
        return None;
    }
    Some(format!("{head}{tail}"))
}

// A slot holding some other kind of value is replaced.
fn with_array(params: &mut Parameters, name: &str, f: impl FnOnce(&mut Vec<Value>)) {
    let slot = params.entry(name).or_insert(Value::Null);
    let mut items = match slot.take() {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    f(&mut items);
    *slot = Value::Array(items);
}

fn with_object(params: &mut Parameters, name: &str, f: impl FnOnce(&mut Parameters)) {
    let slot = params.entry(name).or_insert(Value::Null);
    let mut object = match slot.take() {
        Value::Object(object) => object,
        _ => Parameters::new(),
    };
    f(&mut object);
    *slot = Value::Object(object);
}
