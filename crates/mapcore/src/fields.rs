use serde_json::Value;

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub(crate) fn owned_str(value: &Value, key: &str) -> Option<String> {
    str_field(value, key).map(ToString::to_string)
}

pub(crate) fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

pub(crate) fn i64_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key) {
        Some(raw) => raw.as_i64().or_else(|| raw.as_f64().map(|v| v as i64)),
        None => None,
    }
}

pub(crate) fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

pub(crate) fn f64_list(value: &Value, key: &str) -> Vec<f64> {
    match value.get(key).and_then(Value::as_array) {
        Some(entries) => entries.iter().filter_map(Value::as_f64).collect(),
        None => Vec::new(),
    }
}

pub(crate) fn zoom_field(value: &Value, key: &str) -> Option<i32> {
    match i64_field(value, key) {
        Some(bound) if bound >= 0 => Some(bound as i32),
        _ => None,
    }
}
