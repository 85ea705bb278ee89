//! Class instances
//!
//! An [`Instance`] is a shared handle to the attribute storage of one
//! object. Every access goes through the owning class's property table:
//! writes are checked, coerced and stored, then the trigger runs; a failing
//! trigger restores the previous state before the error is returned.
//!
//! Undeclared attributes of open classes live in a separate extension map
//! and are never validated.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::Class;
use crate::error::{MooseError, MooseResult};
use crate::value::{Record, Value};

#[derive(Default)]
struct InstanceData {
    fields: FxHashMap<String, Value>,
    extra: Vec<(String, Value)>,
}

struct InstanceInner {
    class: Class,
    data: RwLock<InstanceData>,
}

/// Shared handle to a class instance
#[derive(Clone)]
pub struct Instance(Arc<InstanceInner>);

impl Instance {
    pub(crate) fn allocate(class: Class) -> Self {
        Instance(Arc::new(InstanceInner {
            class,
            data: RwLock::new(InstanceData::default()),
        }))
    }

    /// Concrete class of this instance
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn handle_addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn store(&self, name: &str, value: Value) {
        self.0.data.write().fields.insert(name.to_string(), value);
    }

    pub(crate) fn stored(&self, name: &str) -> Value {
        self.0.data.read().fields.get(name).cloned().unwrap_or_default()
    }

    pub(crate) fn store_extra(&self, name: &str, value: Value) {
        let mut data = self.0.data.write();
        match data.extra.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => data.extra.push((name.to_string(), value)),
        }
    }

    fn unknown(&self, name: &str) -> MooseError {
        MooseError::UnknownProperty {
            property: name.to_string(),
            class: self.class().name().to_string(),
        }
    }

    /// Read an attribute
    ///
    /// Declared attributes that are unset read as undefined. Closed classes
    /// reject undeclared names with `UnknownProperty`.
    pub fn get(&self, name: &str) -> MooseResult<Value> {
        if self.class().property(name).is_some() {
            return Ok(self.stored(name));
        }
        if self.class().is_final() {
            return Err(self.unknown(name));
        }
        let data = self.0.data.read();
        Ok(data
            .extra
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default())
    }

    /// Write an attribute
    ///
    /// # Errors
    ///
    /// - `ReadOnlyViolation`, `RequiredPropertyMissing` or a coercion error
    ///   from the descriptor checks; nothing is stored
    /// - `UnknownProperty` for undeclared names on closed classes
    /// - the trigger's own error, after the previous value is restored
    pub fn set(&self, name: &str, value: impl Into<Value>) -> MooseResult<()> {
        let class = self.class();
        let property = match class.property(name) {
            Some(property) => property.clone(),
            None if class.is_final() => return Err(self.unknown(name)),
            None => {
                self.store_extra(name, value.into());
                return Ok(());
            }
        };

        let value = property.check_set(value.into(), class.name())?;
        let previous = self
            .0
            .data
            .write()
            .fields
            .insert(name.to_string(), value.clone());

        if !property.has_trigger() {
            return Ok(());
        }

        let old = previous.clone().unwrap_or_default();
        if let Err(err) = property.run_trigger(self, &value, &old) {
            self.restore(name, previous);
            tracing::trace!(class = %class.name(), property = name, "rolled back write");
            return Err(err);
        }
        Ok(())
    }

    /// Remove an attribute
    ///
    /// # Errors
    ///
    /// - `CannotDeleteRequired` for required attributes
    /// - `UnknownProperty` for undeclared names on closed classes
    /// - the trigger's own error, after the previous value is restored
    pub fn delete(&self, name: &str) -> MooseResult<()> {
        let class = self.class();
        let property = match class.property(name) {
            Some(property) => property.clone(),
            None if class.is_final() => return Err(self.unknown(name)),
            None => {
                self.0.data.write().extra.retain(|(k, _)| k != name);
                return Ok(());
            }
        };

        property.validate_deletable(class.name())?;
        let previous = self.0.data.write().fields.remove(name);

        let old = previous.clone().unwrap_or_default();
        if let Err(err) = property.run_trigger(self, &Value::Undefined, &old) {
            self.restore(name, previous);
            tracing::trace!(class = %class.name(), property = name, "rolled back delete");
            return Err(err);
        }
        Ok(())
    }

    fn restore(&self, name: &str, previous: Option<Value>) {
        let mut data = self.0.data.write();
        match previous {
            Some(value) => {
                data.fields.insert(name.to_string(), value);
            }
            None => {
                data.fields.remove(name);
            }
        }
    }

    /// Check if an attribute currently holds a value
    pub fn has(&self, name: &str) -> bool {
        let data = self.0.data.read();
        match data.fields.get(name) {
            Some(value) => !value.is_absent(),
            None => data.extra.iter().any(|(k, v)| k == name && !v.is_absent()),
        }
    }

    /// Names of the enumerable attributes, declared ones first
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(k, _)| k).collect()
    }

    /// Enumerable attributes with their values, declared ones first
    pub fn entries(&self) -> Vec<(String, Value)> {
        let data = self.0.data.read();
        let declared = self
            .class()
            .properties()
            .iter()
            .filter(|p| p.is_enumerable())
            .filter_map(|p| {
                data.fields
                    .get(p.name())
                    .map(|v| (p.name().to_string(), v.clone()))
            });
        declared.chain(data.extra.iter().cloned()).collect()
    }

    /// Enumerable attributes holding a value, as initial values for a copy
    pub fn to_record(&self) -> Record {
        self.entries()
            .into_iter()
            .filter(|(_, v)| !v.is_absent())
            .collect()
    }

    /// Call a method synchronously with this instance as receiver
    ///
    /// # Errors
    ///
    /// `UnknownMethod` if the class has no such method, `DeferredMethod` if
    /// its body is deferred, or any validation or body error.
    pub fn call(&self, method: &str, arg: impl Into<Value>) -> MooseResult<Value> {
        let found = self.lookup_method(method)?;
        found.call_on(self, arg)
    }

    /// Call a method and await its result with this instance as receiver
    pub async fn call_async(&self, method: &str, arg: impl Into<Value>) -> MooseResult<Value> {
        let found = self.lookup_method(method)?;
        found.call_on_async(self, arg).await
    }

    fn lookup_method(&self, method: &str) -> MooseResult<crate::method::Method> {
        self.class()
            .method(method)
            .cloned()
            .ok_or_else(|| MooseError::UnknownMethod {
                method: method.to_string(),
                class: self.class().name().to_string(),
            })
    }

    /// Snapshot of every stored value, hidden ones included
    fn snapshot(&self) -> (Vec<(String, Value)>, Vec<(String, Value)>) {
        let data = self.0.data.read();
        let mut fields: Vec<(String, Value)> = data
            .fields
            .iter()
            .filter(|(_, v)| !v.is_absent())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        (fields, data.extra.clone())
    }
}

/// Same class and attribute-wise equal values
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if !self.class().ptr_eq(other.class()) {
            return false;
        }
        let (fields, extra) = self.snapshot();
        let (other_fields, other_extra) = other.snapshot();
        fields == other_fields
            && Record::from_iter(extra) == Record::from_iter(other_extra)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.class().name());
        for (name, value) in self.entries() {
            s.field(&name, &value);
        }
        s.finish()
    }
}
