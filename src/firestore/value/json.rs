use serde_json::{Map, Number, Value};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

impl From<Value> for FirestoreValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FirestoreValue::null(),
            Value::Bool(flag) => FirestoreValue::from_bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => FirestoreValue::from_integer(integer),
                None => FirestoreValue::from_double(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => FirestoreValue::from_string(text),
            Value::Array(items) => {
                FirestoreValue::from_array(items.into_iter().map(FirestoreValue::from).collect())
            }
            Value::Object(map) => FirestoreValue::from_map(map_to_data(map)),
        }
    }
}

impl FirestoreValue {
    /// Renders the value as JSON. Reference fields become their document path.
    pub fn to_json(&self) -> Value {
        match self.kind() {
            ValueKind::Null => Value::Null,
            ValueKind::Boolean(flag) => Value::Bool(*flag),
            ValueKind::Integer(integer) => Value::Number((*integer).into()),
            ValueKind::Double(double) => Number::from_f64(*double)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueKind::String(text) => Value::String(text.clone()),
            ValueKind::Reference(reference) => Value::String(reference.path().canonical_string()),
            ValueKind::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ValueKind::Map(map) => data_to_json(map),
        }
    }
}

/// Builds document data from a JSON object.
pub fn data_from_json(value: Value) -> FirestoreResult<DocumentData> {
    match value {
        Value::Object(map) => Ok(map_to_data(map)),
        other => Err(invalid_argument(format!(
            "Document data must be a JSON object, found {other}"
        ))),
    }
}

/// Renders document data as a JSON object.
pub fn data_to_json(data: &DocumentData) -> Value {
    Value::Object(
        data.iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

fn map_to_data(map: Map<String, Value>) -> DocumentData {
    map.into_iter()
        .map(|(key, value)| (key, FirestoreValue::from(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_nested_objects() {
        let data = data_from_json(json!({
            "title": "hello",
            "views": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "author": { "name": "ada" }
        }))
        .unwrap();

        assert_eq!(data["views"].as_i64(), Some(3));
        assert_eq!(data["ratio"].as_f64(), Some(0.5));
        assert_eq!(data["tags"].as_array().map(<[_]>::len), Some(2));
        assert_eq!(
            data["author"].as_map().and_then(|m| m["name"].as_str()),
            Some("ada")
        );
        assert_eq!(data_to_json(&data)["author"]["name"], json!("ada"));
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = data_from_json(json!([1, 2])).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
