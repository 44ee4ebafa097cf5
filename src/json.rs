use crate::Value;
pub use serde_json::Value as JsonValue;


impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::text(s),
            JsonValue::Array(seq) =>
                Value::sequence(
                    seq.iter()
                        .map(Value::from)
                        .collect::<_>()
                ),
            JsonValue::Object(obj) =>
                Value::mapping(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), Value::from(v)))
                        .collect::<_>()
                ),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from(&json)
    }
}
