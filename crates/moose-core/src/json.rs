//! JSON conversion
//!
//! Values serialize to plain JSON: dates as RFC 3339 text, buffers as UTF-8
//! text, absent and hidden attributes omitted. Maps keyed by anything but
//! strings are written as `[key, value]` pairs. Reading JSON back yields the
//! raw list/record shapes that class construction accepts, so an instance
//! survives a round trip through text.

use chrono::SecondsFormat;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::array::TypedArray;
use crate::error::{MooseError, MooseResult};
use crate::instance::Instance;
use crate::map::TypedMap;
use crate::ty::Type;
use crate::value::{Record, Value};

/// Largest magnitude at which every integer is exact in an `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Buffer(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Value::Date(date) => {
                serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::List(items) => serializer.collect_seq(items),
            Value::Record(record) => record.serialize(serializer),
            Value::Array(array) => array.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
            Value::Object(instance) => instance.serialize(serializer),
        }
    }
}

fn serialize_entries<'a, S, I>(serializer: S, entries: I) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let entries: Vec<_> = entries.into_iter().filter(|(_, v)| !v.is_absent()).collect();
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(serializer, self.iter())
    }
}

impl Serialize for TypedArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let items = self.to_vec();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in &items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

/// String-keyed maps become JSON objects; any other key type is written as
/// `[key, value]` pairs so keys keep their type through a round trip
impl Serialize for TypedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        if let Type::String = self.class().key_type() {
            let mut map = serializer.serialize_map(Some(entries.len()))?;
            for (key, value) in &entries {
                map.serialize_entry(&key.to_string(), value)?;
            }
            return map.end();
        }
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for (key, value) in &entries {
            seq.serialize_element(&(key, value))?;
        }
        seq.end()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        serialize_entries(serializer, entries.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl Value {
    /// Convert parsed JSON into raw values (lists and records)
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON form of this value
    pub fn to_json(&self) -> MooseResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| MooseError::Custom(e.into()))
    }

    /// JSON text of this value
    pub fn to_json_string(&self) -> MooseResult<String> {
        serde_json::to_string(self).map_err(|e| MooseError::Custom(e.into()))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl Instance {
    /// JSON form of the enumerable attributes
    pub fn to_json(&self) -> MooseResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| MooseError::Custom(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapClass;
    use serde_json::json;

    #[test]
    fn test_integral_numbers_serialize_as_integers() {
        assert_eq!(Value::Number(4.0).to_json().unwrap(), json!(4));
        assert_eq!(Value::Number(2.5).to_json().unwrap(), json!(2.5));
    }

    #[test]
    fn test_absent_record_entries_omitted() {
        let record = Record::new().with("a", 1).with("b", Value::Undefined);
        assert_eq!(Value::from(record).to_json().unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn test_from_json_builds_raw_shapes() {
        let value = Value::from_json(json!({ "name": "Byron", "grades": [1, 2] }));
        let record = value.as_record().unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("Byron")));
        assert_eq!(
            record.get("grades"),
            Some(&Value::list([Value::Number(1.0), Value::Number(2.0)]))
        );
    }

    #[test]
    fn test_non_string_keyed_map_as_pairs() {
        let map = MapClass::of(Type::Boolean, Type::Number)
            .construct(Value::list([Value::list([Value::from(false), Value::from(1)])]))
            .unwrap();
        assert_eq!(Value::from(map).to_json().unwrap(), json!([[false, 1]]));

        let names = MapClass::of(Type::String, Type::Number)
            .construct(Value::list([Value::list([Value::from("a"), Value::from(1)])]))
            .unwrap();
        assert_eq!(Value::from(names).to_json().unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn test_buffer_as_text() {
        let value = Value::from(&b"Hello"[..]);
        assert_eq!(value.to_json().unwrap(), json!("Hello"));
    }
}
