//! Typed arrays
//!
//! An [`ArrayClass`] is a declared homogeneous sequence type; a
//! [`TypedArray`] is a shared handle to one instance of it. Every element
//! passes through coercion on insertion, and every mutation runs the
//! array's trigger with rollback on failure.
//!
//! Arrays are dense: elements are only removed from the ends (`pop`,
//! `shift`, `truncate`), never by punching holes.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::coerce::coerce;
use crate::error::{MooseError, MooseResult};
use crate::property::Access;
use crate::ty::Type;
use crate::value::Value;

/// Side effect run after each element change: `(array, new, old, index)`
///
/// The array already holds the new state while the trigger runs, so length
/// bounds and cross-element rules can be checked on it directly. Returning
/// an error restores the array to its contents before the change, undoing
/// any writes the trigger made on the way.
pub type ArrayTrigger =
    Arc<dyn Fn(&TypedArray, &Value, &Value, usize) -> MooseResult<()> + Send + Sync>;

/// Declaration of a typed array
#[derive(Clone)]
pub struct ArraySpec {
    element: Type,
    access: Access,
    trigger: Option<ArrayTrigger>,
}

impl ArraySpec {
    /// Read-write array of `element`, without trigger
    pub fn new(element: impl Into<Type>) -> Self {
        ArraySpec {
            element: element.into(),
            access: Access::ReadWrite,
            trigger: None,
        }
    }

    /// Set the accessor mode
    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Make the array read-only
    pub fn read_only(self) -> Self {
        self.access(Access::ReadOnly)
    }

    /// Side effect run after each element change
    pub fn trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(&TypedArray, &Value, &Value, usize) -> MooseResult<()> + Send + Sync + 'static,
    {
        self.trigger = Some(Arc::new(trigger));
        self
    }
}

impl From<Type> for ArraySpec {
    fn from(element: Type) -> Self {
        ArraySpec::new(element)
    }
}

struct ArrayClassDef {
    name: String,
    element: Type,
    access: Access,
    trigger: Option<ArrayTrigger>,
}

/// Declared typed array type
#[derive(Clone)]
pub struct ArrayClass(Arc<ArrayClassDef>);

impl ArrayClass {
    /// Declare a typed array type
    ///
    /// # Errors
    ///
    /// `InvalidArrayType` if the element type is a raw list; nested
    /// sequences must be declared as typed arrays themselves.
    pub fn define(spec: impl Into<ArraySpec>) -> MooseResult<Self> {
        let spec = spec.into();
        let name = format!("TypedArray<{}>", spec.element.name());
        if matches!(spec.element, Type::List) {
            return Err(MooseError::InvalidArrayType { name });
        }

        tracing::debug!(array = %name, access = %spec.access, "defined typed array");

        Ok(ArrayClass(Arc::new(ArrayClassDef {
            name,
            element: spec.element,
            access: spec.access,
            trigger: spec.trigger,
        })))
    }

    /// Read-write typed array of `element`
    pub fn of(element: impl Into<Type>) -> MooseResult<Self> {
        Self::define(ArraySpec::new(element))
    }

    /// Type name, `TypedArray<Elem>`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Element type
    pub fn element_type(&self) -> &Type {
        &self.0.element
    }

    /// Accessor mode
    pub fn access(&self) -> Access {
        self.0.access
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ArrayClass) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Build an array from a raw list, another typed array, or nothing
    ///
    /// All elements are coerced first; the trigger then runs once per
    /// element in order. Any failure aborts the whole construction.
    pub fn construct(&self, init: Value) -> MooseResult<TypedArray> {
        let items = match init {
            Value::Undefined | Value::Null => Vec::new(),
            Value::List(items) => items,
            Value::Array(other) => other.to_vec(),
            other => {
                return Err(MooseError::CannotConvert {
                    from: other.type_name(),
                    to: self.name().to_string(),
                })
            }
        };

        let items = items
            .into_iter()
            .map(|item| coerce(&self.0.element, item))
            .collect::<MooseResult<Vec<_>>>()?;

        let array = TypedArray(Arc::new(ArrayInner {
            class: self.clone(),
            items: RwLock::new(items),
        }));

        if self.0.trigger.is_some() {
            for index in 0..array.len() {
                let value = array.get(index).unwrap_or_default();
                array.run_trigger(&value, &Value::Undefined, index)?;
            }
        }

        Ok(array)
    }

    /// Build an array from any list of values
    pub fn from_values<I, T>(&self, values: I) -> MooseResult<TypedArray>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.construct(Value::list(values))
    }
}

impl fmt::Debug for ArrayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayClass")
            .field("name", &self.0.name)
            .field("access", &self.0.access)
            .finish()
    }
}

struct ArrayInner {
    class: ArrayClass,
    items: RwLock<Vec<Value>>,
}

/// Shared handle to a typed array instance
#[derive(Clone)]
pub struct TypedArray(Arc<ArrayInner>);

impl TypedArray {
    /// Declared type of this array
    pub fn class(&self) -> &ArrayClass {
        &self.0.class
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.read().get(index).cloned()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.0.items.read().is_empty()
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.read().clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &TypedArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn handle_addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Write the element at `index`; `index == len` appends
    ///
    /// # Errors
    ///
    /// - `ReadOnlyCollection` for read-only arrays
    /// - `IndexOutOfBounds` if the write would leave a hole
    /// - coercion errors, or the trigger's error after rollback
    pub fn set(&self, index: usize, value: impl Into<Value>) -> MooseResult<()> {
        self.check_writable()?;
        let value = coerce(&self.0.class.0.element, value.into())?;

        let (old, snapshot) = {
            let mut items = self.0.items.write();
            let len = items.len();
            if index > len {
                return Err(MooseError::IndexOutOfBounds { index, len });
            }
            let snapshot = self.snapshot(&items);
            let old = if index == len {
                items.push(value.clone());
                Value::Undefined
            } else {
                std::mem::replace(&mut items[index], value.clone())
            };
            (old, snapshot)
        };

        if let Err(err) = self.run_trigger(&value, &old, index) {
            self.rollback(snapshot);
            tracing::trace!(array = %self.class().name(), index, "rolled back element write");
            return Err(err);
        }
        Ok(())
    }

    /// Append an element, returning the new length
    pub fn push(&self, value: impl Into<Value>) -> MooseResult<usize> {
        let index = self.len();
        self.set(index, value)?;
        Ok(index + 1)
    }

    /// Remove and return the last element
    pub fn pop(&self) -> MooseResult<Option<Value>> {
        self.check_writable()?;
        let (removed, index, snapshot) = {
            let mut items = self.0.items.write();
            if items.is_empty() {
                return Ok(None);
            }
            let snapshot = self.snapshot(&items);
            match items.pop() {
                Some(removed) => {
                    let index = items.len();
                    (removed, index, snapshot)
                }
                None => return Ok(None),
            }
        };

        if let Err(err) = self.run_trigger(&Value::Undefined, &removed, index) {
            self.rollback(snapshot);
            tracing::trace!(array = %self.class().name(), index, "rolled back pop");
            return Err(err);
        }
        Ok(Some(removed))
    }

    /// Remove and return the first element
    pub fn shift(&self) -> MooseResult<Option<Value>> {
        self.check_writable()?;
        let (removed, snapshot) = {
            let mut items = self.0.items.write();
            if items.is_empty() {
                return Ok(None);
            }
            let snapshot = self.snapshot(&items);
            (items.remove(0), snapshot)
        };

        if let Err(err) = self.run_trigger(&Value::Undefined, &removed, 0) {
            self.rollback(snapshot);
            tracing::trace!(array = %self.class().name(), "rolled back shift");
            return Err(err);
        }
        Ok(Some(removed))
    }

    /// Shrink to `len` elements; growing is a no-op
    ///
    /// The trigger sees the last removed element as the old value.
    pub fn truncate(&self, len: usize) -> MooseResult<()> {
        self.check_writable()?;
        let (old, snapshot) = {
            let mut items = self.0.items.write();
            if len >= items.len() {
                return Ok(());
            }
            let snapshot = self.snapshot(&items);
            let tail = items.split_off(len);
            (tail.last().cloned().unwrap_or_default(), snapshot)
        };

        if let Err(err) = self.run_trigger(&Value::Undefined, &old, len) {
            self.rollback(snapshot);
            tracing::trace!(array = %self.class().name(), len, "rolled back truncate");
            return Err(err);
        }
        Ok(())
    }

    /// Individual elements can never be deleted
    pub fn delete(&self, _index: usize) -> MooseResult<()> {
        Err(MooseError::CannotDeleteElement)
    }

    fn check_writable(&self) -> MooseResult<()> {
        if self.0.class.0.access == Access::ReadOnly {
            return Err(MooseError::ReadOnlyCollection { kind: "Array" });
        }
        Ok(())
    }

    // Whole contents before a change; only kept when a trigger could fail
    fn snapshot(&self, items: &[Value]) -> Option<Vec<Value>> {
        self.0.class.0.trigger.as_ref().map(|_| items.to_vec())
    }

    // Anything the trigger did to the array is undone with the change
    fn rollback(&self, snapshot: Option<Vec<Value>>) {
        if let Some(items) = snapshot {
            *self.0.items.write() = items;
        }
    }

    fn run_trigger(&self, value: &Value, old: &Value, index: usize) -> MooseResult<()> {
        match &self.0.class.0.trigger {
            Some(trigger) => trigger(self, value, old, index),
            None => Ok(()),
        }
    }
}

/// Element-wise equality
impl PartialEq for TypedArray {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.to_vec() == other.to_vec()
    }
}

impl fmt::Debug for TypedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.class().name())?;
        f.debug_list().entries(self.to_vec()).finish()
    }
}
