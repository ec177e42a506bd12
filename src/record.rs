//! Input records and the payload accepted by a write.
//!
//! A [`Record`] maps column names to a scalar or null. Records of one
//! [`Dataset`] may carry different key sets. Setting a key twice keeps the
//! last value (duplicate keys are otherwise not meaningful input).

use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{WriteError, WriteResult},
    kind::Scalar,
};

pub type Dataset = Vec<Record>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Option<Scalar>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any earlier value in place.
    pub fn set(&mut self, key: impl Into<String>, value: Option<Scalar>) {
        let key = key.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.set(key, Some(value.into()));
    }

    pub fn insert_null(&mut self, key: impl Into<String>) {
        self.set(key, None);
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// `None` when the key is absent, `Some(None)` when it is present but null.
    pub fn get(&self, key: &str) -> Option<Option<&Scalar>> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Scalar>)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts a JSON object into a record. Any other JSON value is
    /// rejected as invalid input; nested values as unsupported scalars.
    pub fn from_json(value: &JsonValue) -> WriteResult<Self> {
        match value {
            JsonValue::Object(map) => Self::from_json_object(map),
            other => Err(WriteError::InvalidInput(format!(
                "expected a record (JSON object), found {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn from_json_object(map: &Map<String, JsonValue>) -> WriteResult<Self> {
        let mut record = Record::new();
        for (key, value) in map {
            record.set(key.clone(), scalar_from_json(key, value)?);
        }
        Ok(record)
    }
}

impl IntoIterator for Record {
    type Item = (String, Option<Scalar>);
    type IntoIter = std::vec::IntoIter<(String, Option<Scalar>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Option<Scalar>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.set(key, value.into());
        }
        record
    }
}

/// Data argument of a write: one record or an ordered sequence of them.
/// A single record behaves exactly like a one-element dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Record),
    Many(Dataset),
}

impl Payload {
    pub fn into_dataset(self) -> Dataset {
        match self {
            Payload::One(record) => vec![record],
            Payload::Many(records) => records,
        }
    }

    /// Accepts a JSON object (one record) or an array whose elements are all
    /// objects.
    pub fn from_json(value: JsonValue) -> WriteResult<Self> {
        match value {
            JsonValue::Object(map) => Ok(Payload::One(Record::from_json_object(&map)?)),
            JsonValue::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let JsonValue::Object(map) = item else {
                        return Err(WriteError::InvalidInput(format!(
                            "element {idx} of the dataset is {}, expected a record (JSON object)",
                            json_type_name(item)
                        )));
                    };
                    records.push(Record::from_json_object(map)?);
                }
                Ok(Payload::Many(records))
            }
            other => Err(WriteError::InvalidInput(format!(
                "data must be a record or a list of records, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Payload::One(record)
    }
}

impl From<Dataset> for Payload {
    fn from(records: Dataset) -> Self {
        Payload::Many(records)
    }
}

/// JSON booleans become integers 1/0, matching MySQL's `BOOL` alias.
fn scalar_from_json(key: &str, value: &JsonValue) -> WriteResult<Option<Scalar>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(flag) => Ok(Some(Scalar::Integer(i64::from(*flag)))),
        JsonValue::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Some(Scalar::Integer(value)))
            } else if let Some(value) = number.as_f64() {
                Ok(Some(Scalar::Float(value)))
            } else {
                Err(WriteError::UnsupportedScalar {
                    column: key.to_string(),
                    found: "an out-of-range number",
                })
            }
        }
        JsonValue::String(text) => Ok(Some(Scalar::Text(text.clone()))),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(WriteError::UnsupportedScalar {
            column: key.to_string(),
            found: json_type_name(value),
        }),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_a_key_twice_keeps_the_last_value() {
        let mut record = Record::new().with("a", 1).with("b", "x");
        record.insert("a", 2);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(Some(&Scalar::Integer(2))));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn null_and_absent_are_distinguished() {
        let mut record = Record::new();
        record.insert_null("gone");
        assert_eq!(record.get("gone"), Some(None));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn bare_json_object_is_a_single_record() {
        let payload = Payload::from_json(json!({"a": 1})).expect("object payload");
        let dataset = payload.into_dataset();
        assert_eq!(dataset, vec![Record::new().with("a", 1)]);
    }

    #[test]
    fn json_array_of_objects_keeps_order_and_types() {
        let payload = Payload::from_json(json!([
            {"a": 1, "b": "x", "c": 2.5, "d": null, "e": true},
            {"a": 2}
        ]))
        .expect("array payload");
        let dataset = payload.into_dataset();
        assert_eq!(dataset.len(), 2);
        let first = &dataset[0];
        assert_eq!(first.get("a"), Some(Some(&Scalar::Integer(1))));
        assert_eq!(first.get("b"), Some(Some(&Scalar::Text("x".to_string()))));
        assert_eq!(first.get("c"), Some(Some(&Scalar::Float(2.5))));
        assert_eq!(first.get("d"), Some(None));
        assert_eq!(first.get("e"), Some(Some(&Scalar::Integer(1))));
    }

    #[test]
    fn non_record_payloads_are_invalid_input() {
        for value in [json!(3), json!("text"), json!(null), json!([{"a": 1}, 4])] {
            let err = Payload::from_json(value).expect_err("must reject");
            assert!(matches!(err, WriteError::InvalidInput(_)), "{err}");
        }
    }

    #[test]
    fn nested_values_are_unsupported_scalars() {
        let err = Payload::from_json(json!({"tags": ["a", "b"]})).expect_err("nested");
        match err {
            WriteError::UnsupportedScalar { column, found } => {
                assert_eq!(column, "tags");
                assert_eq!(found, "an array");
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
