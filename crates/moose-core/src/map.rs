//! Typed maps
//!
//! A [`MapClass`] declares key and value types; a [`TypedMap`] is a shared
//! handle to one instance. Keys and values are coerced on every `set`, so a
//! map can be copied into a differently typed map and each entry converts
//! independently.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::coerce::coerce;
use crate::error::{MooseError, MooseResult};
use crate::property::Access;
use crate::ty::Type;
use crate::value::Value;

/// Side effect run after each entry change: `(map, new, old, key)`
///
/// `new` is undefined for deletions and `old` is undefined for fresh keys.
/// Returning an error rolls the change back.
pub type MapTrigger =
    Arc<dyn Fn(&TypedMap, &Value, &Value, &Value) -> MooseResult<()> + Send + Sync>;

/// Declaration of a typed map
#[derive(Clone)]
pub struct MapSpec {
    key: Type,
    value: Type,
    access: Access,
    trigger: Option<MapTrigger>,
}

impl MapSpec {
    /// Read-write map from `key` to `value`, without trigger
    pub fn new(key: impl Into<Type>, value: impl Into<Type>) -> Self {
        MapSpec {
            key: key.into(),
            value: value.into(),
            access: Access::ReadWrite,
            trigger: None,
        }
    }

    /// Set the accessor mode
    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Make the map read-only
    pub fn read_only(self) -> Self {
        self.access(Access::ReadOnly)
    }

    /// Side effect run after each entry change
    pub fn trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(&TypedMap, &Value, &Value, &Value) -> MooseResult<()> + Send + Sync + 'static,
    {
        self.trigger = Some(Arc::new(trigger));
        self
    }
}

struct MapClassDef {
    name: String,
    key: Type,
    value: Type,
    access: Access,
    trigger: Option<MapTrigger>,
}

/// Declared typed map type
#[derive(Clone)]
pub struct MapClass(Arc<MapClassDef>);

impl MapClass {
    /// Declare a typed map type
    pub fn define(spec: MapSpec) -> Self {
        let name = format!("TypedMap<{},{}>", spec.key.name(), spec.value.name());
        tracing::debug!(map = %name, access = %spec.access, "defined typed map");

        MapClass(Arc::new(MapClassDef {
            name,
            key: spec.key,
            value: spec.value,
            access: spec.access,
            trigger: spec.trigger,
        }))
    }

    /// Read-write map from `key` to `value`
    pub fn of(key: impl Into<Type>, value: impl Into<Type>) -> Self {
        Self::define(MapSpec::new(key, value))
    }

    /// Type name, `TypedMap<Key,Value>`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Key type
    pub fn key_type(&self) -> &Type {
        &self.0.key
    }

    /// Value type
    pub fn value_type(&self) -> &Type {
        &self.0.value
    }

    /// Accessor mode
    pub fn access(&self) -> Access {
        self.0.access
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &MapClass) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Build a map from key/value pairs, another map, a record or nothing
    ///
    /// Each pair goes through `set` (coercion and trigger); read-only maps
    /// accept their initial entries.
    pub fn construct(&self, init: Value) -> MooseResult<TypedMap> {
        let pairs: Vec<(Value, Value)> = match init {
            Value::Undefined | Value::Null => Vec::new(),
            Value::List(items) => items
                .into_iter()
                .map(|pair| self.split_pair(pair))
                .collect::<MooseResult<_>>()?,
            Value::Map(other) => other.entries(),
            Value::Record(record) => record
                .into_iter()
                .map(|(key, value)| (Value::String(key), value))
                .collect(),
            other => {
                return Err(MooseError::CannotConvert {
                    from: other.type_name(),
                    to: self.name().to_string(),
                })
            }
        };

        let map = TypedMap(Arc::new(MapInner {
            class: self.clone(),
            data: RwLock::new(MapData::default()),
        }));
        for (key, value) in pairs {
            map.apply_set(key, value)?;
        }
        Ok(map)
    }

    fn split_pair(&self, pair: Value) -> MooseResult<(Value, Value)> {
        match pair {
            Value::List(mut items) if items.len() >= 2 => {
                items.truncate(2);
                let value = items.pop().unwrap_or_default();
                let key = items.pop().unwrap_or_default();
                Ok((key, value))
            }
            other => Err(MooseError::CannotConvert {
                from: other.type_name(),
                to: self.name().to_string(),
            }),
        }
    }
}

impl fmt::Debug for MapClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapClass")
            .field("name", &self.0.name)
            .field("access", &self.0.access)
            .finish()
    }
}

/// Hashable identity of a coerced key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyRepr {
    Bool(bool),
    Number(u64),
    String(String),
    Buffer(Vec<u8>),
    Date(DateTime<Utc>),
    Handle(usize),
    Structural(String),
}

impl KeyRepr {
    fn of(key: &Value) -> Self {
        match key {
            Value::Bool(b) => KeyRepr::Bool(*b),
            // -0 and 0 are the same key
            Value::Number(n) if *n == 0.0 => KeyRepr::Number(0),
            Value::Number(n) if n.is_nan() => KeyRepr::Number(f64::NAN.to_bits()),
            Value::Number(n) => KeyRepr::Number(n.to_bits()),
            Value::String(s) => KeyRepr::String(s.clone()),
            Value::Buffer(bytes) => KeyRepr::Buffer(bytes.clone()),
            Value::Date(date) => KeyRepr::Date(*date),
            Value::Array(array) => KeyRepr::Handle(array.handle_addr()),
            Value::Map(map) => KeyRepr::Handle(Arc::as_ptr(&map.0) as *const () as usize),
            Value::Object(instance) => KeyRepr::Handle(instance.handle_addr()),
            other => KeyRepr::Structural(format!("{:?}", other)),
        }
    }
}

#[derive(Default)]
struct MapData {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<KeyRepr, usize>,
}

impl MapData {
    fn get(&self, key: &KeyRepr) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Insert or replace, returning the replaced value
    fn insert(&mut self, repr: KeyRepr, key: Value, value: Value) -> Option<Value> {
        match self.index.get(&repr) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(repr, self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    fn remove(&mut self, repr: &KeyRepr) -> Option<(Value, Value)> {
        let i = self.index.remove(repr)?;
        let removed = self.entries.swap_remove(i);
        if let Some((moved, _)) = self.entries.get(i) {
            self.index.insert(KeyRepr::of(moved), i);
        }
        Some(removed)
    }
}

struct MapInner {
    class: MapClass,
    data: RwLock<MapData>,
}

/// Shared handle to a typed map instance
#[derive(Clone)]
pub struct TypedMap(Arc<MapInner>);

impl TypedMap {
    /// Declared type of this map
    pub fn class(&self) -> &MapClass {
        &self.0.class
    }

    /// Value stored under `key`, after coercing the key
    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        let key = coerce(&self.0.class.0.key, key.into()).ok()?;
        self.0.data.read().get(&KeyRepr::of(&key)).cloned()
    }

    /// Check if `key` is present
    pub fn contains_key(&self, key: impl Into<Value>) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace an entry
    ///
    /// # Errors
    ///
    /// - `ReadOnlyCollection` for read-only maps
    /// - coercion errors for the key or the value
    /// - the trigger's error, after the previous state is restored
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> MooseResult<()> {
        self.check_writable()?;
        self.apply_set(key.into(), value.into())
    }

    /// Remove an entry; returns `false` if the key was not present
    pub fn delete(&self, key: impl Into<Value>) -> MooseResult<bool> {
        self.check_writable()?;
        let key = match coerce(&self.0.class.0.key, key.into()) {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        let repr = KeyRepr::of(&key);

        let removed = self.0.data.write().remove(&repr);
        let (stored_key, old) = match removed {
            Some(entry) => entry,
            None => return Ok(false),
        };

        if let Err(err) = self.run_trigger(&Value::Undefined, &old, &stored_key) {
            self.0.data.write().insert(repr, stored_key, old);
            tracing::trace!(map = %self.class().name(), "rolled back entry delete");
            return Err(err);
        }
        Ok(true)
    }

    /// Keys, in storage order
    pub fn keys(&self) -> Vec<Value> {
        self.0.data.read().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Values, in storage order
    pub fn values(&self) -> Vec<Value> {
        self.0.data.read().entries.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.data.read().entries.clone()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.data.read().entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.data.read().entries.is_empty()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &TypedMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn apply_set(&self, key: Value, value: Value) -> MooseResult<()> {
        let key = coerce(&self.0.class.0.key, key)?;
        let value = coerce(&self.0.class.0.value, value)?;
        let repr = KeyRepr::of(&key);

        let previous = self
            .0
            .data
            .write()
            .insert(repr.clone(), key.clone(), value.clone());

        let old = previous.clone().unwrap_or_default();
        if let Err(err) = self.run_trigger(&value, &old, &key) {
            let mut data = self.0.data.write();
            match previous {
                Some(previous) => {
                    data.insert(repr, key, previous);
                }
                None => {
                    data.remove(&repr);
                }
            }
            tracing::trace!(map = %self.class().name(), "rolled back entry write");
            return Err(err);
        }
        Ok(())
    }

    fn check_writable(&self) -> MooseResult<()> {
        if self.0.class.0.access == Access::ReadOnly {
            return Err(MooseError::ReadOnlyCollection { kind: "Map" });
        }
        Ok(())
    }

    fn run_trigger(&self, value: &Value, old: &Value, key: &Value) -> MooseResult<()> {
        match &self.0.class.0.trigger {
            Some(trigger) => trigger(self, value, old, key),
            None => Ok(()),
        }
    }
}

/// Entry-wise equality, independent of insertion order
impl PartialEq for TypedMap {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let ours = self.0.data.read();
        let theirs = other.0.data.read();
        ours.entries.len() == theirs.entries.len()
            && ours
                .entries
                .iter()
                .all(|(key, value)| theirs.get(&KeyRepr::of(key)) == Some(value))
    }
}

impl fmt::Debug for TypedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.class().name())?;
        f.debug_map().entries(self.entries()).finish()
    }
}
