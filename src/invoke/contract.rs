use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Typed shape a model response must satisfy.
///
/// `validate` is pure: it never touches the network, so every contract can be
/// unit tested against hand-written JSON.
pub trait Contract: Sized {
    /// Name used in errors and logs
    const NAME: &'static str;

    /// JSON schema handed to the model
    fn schema() -> Value;

    fn validate(value: Value) -> Result<Self, Vec<String>>;
}

/// JSON schema for a serde type, as a plain value
pub fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// Pull a list out of either a bare array or an object holding it under one of `keys`,
/// decoding every element and reporting each bad one by index
pub fn decode_list<T: DeserializeOwned>(
    value: Value,
    keys: &[&str],
    label: &str,
) -> Result<Vec<T>, Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match keys.iter().find_map(|k| map.remove(*k)) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(vec![format!("`{}` must be an array", keys[0])]),
            None => return Err(vec![format!("missing `{}` array", keys[0])]),
        },
        _ => return Err(vec![format!("expected an object with a `{}` array", keys[0])]),
    };

    let mut decoded = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(v) => decoded.push(v),
            Err(e) => errors.push(format!("{}[{}]: {}", label, idx, e)),
        }
    }

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(errors)
    }
}
