use crate::Value;
pub use serde_yaml::Value as YamlValue;


impl From<&YamlValue> for Value {
    fn from(yaml: &YamlValue) -> Self {
        match yaml {
            YamlValue::Null => Value::Null,
            YamlValue::Bool(b) => Value::Bool(*b),
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            YamlValue::String(s) => Value::text(s),
            YamlValue::Sequence(seq) =>
                Value::sequence(
                    seq.iter()
                        .map(Value::from)
                        .collect::<_>()
                ),
            YamlValue::Mapping(obj) =>
                Value::mapping(
                    obj.iter()
                        .map(|(k, v)| (key_text(k), Value::from(v)))
                        .collect::<_>()
                ),
            YamlValue::Tagged(tagged) => Value::from(&tagged.value),
        }
    }
}

impl From<YamlValue> for Value {
    fn from(yaml: YamlValue) -> Self {
        Value::from(&yaml)
    }
}

fn key_text(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}
