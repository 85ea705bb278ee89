//! Dynamic values
//!
//! Every attribute, collection element and method argument is a [`Value`].
//! Scalars are stored inline; typed arrays, typed maps and class instances
//! are shared handles, so cloning a `Value` never deep-copies them.
//!
//! Raw [`Value::List`] and [`Value::Record`] are the untyped shapes callers
//! pass as initial values. Coercion turns them into typed collections and
//! instances.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::array::TypedArray;
use crate::error::MooseResult;
use crate::instance::Instance;
use crate::map::TypedMap;

/// Runtime representation of an attribute value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Missing value
    #[default]
    Undefined,
    /// Explicit null; treated as absent by validation
    Null,
    /// Boolean
    Bool(bool),
    /// Number (IEEE 754 double precision)
    Number(f64),
    /// Text
    String(String),
    /// Binary buffer
    Buffer(Vec<u8>),
    /// Point in time
    Date(DateTime<Utc>),
    /// Invocable value
    Function(Function),
    /// Untyped sequence
    List(Vec<Value>),
    /// Untyped key/value structure
    Record(Record),
    /// Typed array handle
    Array(TypedArray),
    /// Typed map handle
    Map(TypedMap),
    /// Class instance handle
    Object(Instance),
}

impl Value {
    /// Build an untyped list from anything convertible to values
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Check if this value is undefined or null
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if this value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Name of the value's runtime type, used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Number(_) => "Number".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Buffer(_) => "Buffer".to_string(),
            Value::Date(_) => "Date".to_string(),
            Value::Function(_) => "Function".to_string(),
            Value::List(_) => "Array".to_string(),
            Value::Record(_) => "Object".to_string(),
            Value::Array(array) => array.class().name().to_string(),
            Value::Map(map) => map.class().name().to_string(),
            Value::Object(instance) => instance.class().name().to_string(),
        }
    }

    /// Truthiness: absent, `false`, `0`, `NaN` and `""` are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Get as number if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as boolean if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string slice if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bytes if this is a buffer
    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Value::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get as date if this is a date
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Get the function if this is invocable
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get the elements if this is an untyped list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the record if this is an untyped structure
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Get the typed array handle
    pub fn as_array(&self) -> Option<&TypedArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Get the typed map handle
    pub fn as_map(&self) -> Option<&TypedMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the instance handle
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n == 0.0 {
        write!(f, "0")
    } else {
        write!(f, "{}", n)
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        if !item.is_absent() {
            write!(f, "{}", item)?;
        }
    }
    Ok(())
}

/// Display form used by string coercion
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => format_number(*n, f),
            Value::String(s) => write!(f, "{}", s),
            Value::Buffer(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Date(date) => write!(f, "{}", date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Function(_) => write!(f, "function"),
            Value::List(items) => join(f, items),
            Value::Array(array) => join(f, &array.to_vec()),
            Value::Record(_) => write!(f, "[object Object]"),
            Value::Map(_) => write!(f, "[object Map]"),
            Value::Object(instance) => write!(f, "[object {}]", instance.class().name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Buffer(bytes.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<TypedArray> for Value {
    fn from(array: TypedArray) -> Self {
        Value::Array(array)
    }
}

impl From<TypedMap> for Value {
    fn from(map: TypedMap) -> Self {
        Value::Map(map)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

type FunctionImpl = dyn Fn(Value) -> MooseResult<Value> + Send + Sync;

/// Invocable value stored in attributes (e.g. a function-typed default)
#[derive(Clone)]
pub struct Function(Arc<FunctionImpl>);

impl Function {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> MooseResult<Value> + Send + Sync + 'static,
    {
        Function(Arc::new(f))
    }

    /// Invoke with a single argument
    pub fn call(&self, arg: impl Into<Value>) -> MooseResult<Value> {
        (self.0)(arg.into())
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Arc::as_ptr(&self.0))
    }
}

/// Untyped key/value structure, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Get an entry by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove an entry by key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the record has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key order is irrelevant for equality
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Record`] from `key => value` pairs
///
/// ```ignore
/// let init = record! { "name" => "Byron", "limbs" => 4 };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert($key, $value);
        )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_display_list_joins_elements() {
        let list = Value::list([Value::from(1), Value::from("a"), Value::Undefined]);
        assert_eq!(list.to_string(), "1,a,");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(Value::Record(Record::new()).is_truthy());
    }

    #[test]
    fn test_record_insert_replaces() {
        let mut record = crate::record! { "a" => 1, "b" => 2 };
        assert_eq!(record.insert("a", 3), Some(Value::Number(1.0)));
        assert_eq!(record.len(), 2);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_record_equality_ignores_order() {
        let a = Record::new().with("x", 1).with("y", 2);
        let b = Record::new().with("y", 2).with("x", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i32>).is_undefined());
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
