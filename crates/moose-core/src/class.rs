//! Class definitions
//!
//! A [`ClassBuilder`] collects attribute declarations, an optional parent
//! and the method table; [`ClassBuilder::build`] freezes them into a
//! [`Class`] whose effective property table (parent table merged with own
//! overrides) is computed once, at declaration time.
//!
//! ## Construction protocol
//!
//! 1. Conformance of every interface on the chain is checked (memoized)
//! 2. Ancestors initialize first, root to leaf
//! 3. At each level, own properties get their initial value (caller value
//!    or default, required check, coercion), then own triggers run in
//!    declaration order
//! 4. For closed classes, unknown caller-supplied names are rejected

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{MooseError, MooseResult};
use crate::instance::Instance;
use crate::interface::Interface;
use crate::method::Method;
use crate::property::{Property, PropertySpec};
use crate::value::{Record, Value};

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a declared class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// What a class extends
#[derive(Debug, Clone)]
pub enum Parent {
    /// Another declared class; its attributes and methods are inherited
    Class(Class),
    /// An interface the class must conform to
    Interface(Interface),
}

impl From<Class> for Parent {
    fn from(class: Class) -> Self {
        Parent::Class(class)
    }
}

impl From<&Class> for Parent {
    fn from(class: &Class) -> Self {
        Parent::Class(class.clone())
    }
}

impl From<Interface> for Parent {
    fn from(interface: Interface) -> Self {
        Parent::Interface(interface)
    }
}

impl From<&Interface> for Parent {
    fn from(interface: &Interface) -> Self {
        Parent::Interface(interface.clone())
    }
}

/// Builder for class definitions
///
/// ```ignore
/// let person = ClassBuilder::new("Person")
///     .has("name", PropertySpec::rw(Type::String).required())
///     .has("dob", Type::Date)
///     .final_class()
///     .build()?;
/// ```
#[derive(Default)]
pub struct ClassBuilder {
    name: String,
    parent: Option<Parent>,
    has: Vec<(String, PropertySpec)>,
    is_final: bool,
    methods: Vec<Method>,
}

impl ClassBuilder {
    /// Start a class definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Inherit from a class, or conform to an interface
    pub fn extends(mut self, parent: impl Into<Parent>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare an attribute; redeclaring a name replaces the earlier spec
    pub fn has(mut self, name: impl Into<String>, spec: impl Into<PropertySpec>) -> Self {
        let name = name.into();
        let spec = spec.into();
        match self.has.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = spec,
            None => self.has.push((name, spec)),
        }
        self
    }

    /// Close the class: undeclared attribute names are rejected
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Attach a method
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Validate the declarations and freeze the class
    ///
    /// # Errors
    ///
    /// Any descriptor error (`MissingName`, `MalformedDescriptor`,
    /// `InvalidArrayType`) of the own declarations.
    pub fn build(self) -> MooseResult<Class> {
        let own = self
            .has
            .into_iter()
            .map(|(name, spec)| Property::new(name, spec).map(Arc::new))
            .collect::<MooseResult<Vec<_>>>()?;

        let parent_class = match &self.parent {
            Some(Parent::Class(class)) => Some(class),
            _ => None,
        };

        let mut properties: Vec<Arc<Property>> =
            parent_class.map(|p| p.0.properties.clone()).unwrap_or_default();
        let mut index: FxHashMap<String, usize> =
            parent_class.map(|p| p.0.index.clone()).unwrap_or_default();

        for property in &own {
            match index.get(property.name()) {
                Some(&i) => properties[i] = property.clone(),
                None => {
                    index.insert(property.name().to_string(), properties.len());
                    properties.push(property.clone());
                }
            }
        }

        let mut methods: FxHashMap<String, Method> =
            parent_class.map(|p| p.0.methods.clone()).unwrap_or_default();
        for method in self.methods {
            methods.insert(method.name().to_string(), method);
        }

        let is_final = self.is_final || parent_class.map_or(false, |p| p.is_final());

        let def = ClassDef {
            id: ClassId::next(),
            name: self.name,
            parent: self.parent,
            own,
            properties,
            index,
            methods,
            is_final,
        };

        tracing::debug!(
            class = %def.name,
            id = def.id.0,
            properties = def.properties.len(),
            methods = def.methods.len(),
            is_final = def.is_final,
            "defined class"
        );

        Ok(Class(Arc::new(def)))
    }
}

struct ClassDef {
    id: ClassId,
    name: String,
    parent: Option<Parent>,
    /// Declared on this class, in declaration order
    own: Vec<Arc<Property>>,
    /// Effective table: inherited order first, overrides in place
    properties: Vec<Arc<Property>>,
    index: FxHashMap<String, usize>,
    methods: FxHashMap<String, Method>,
    is_final: bool,
}

/// Declared class handle
#[derive(Clone)]
pub struct Class(Arc<ClassDef>);

impl Class {
    /// Class name used in diagnostics and metadata
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Unique class identity
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Parent declaration, if any
    pub fn parent(&self) -> Option<&Parent> {
        self.0.parent.as_ref()
    }

    /// Parent class, if the class extends one
    pub fn parent_class(&self) -> Option<&Class> {
        match &self.0.parent {
            Some(Parent::Class(class)) => Some(class),
            _ => None,
        }
    }

    /// Whether undeclared attribute names are rejected
    pub fn is_final(&self) -> bool {
        self.0.is_final
    }

    /// Check if this class is `other` or inherits from it
    pub fn is_a(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.ptr_eq(other) {
                return true;
            }
            current = class.parent_class();
        }
        false
    }

    /// Interfaces declared anywhere on the inheritance chain, nearest first
    pub fn interfaces(&self) -> Vec<Interface> {
        let mut found = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(Parent::Interface(interface)) = &class.0.parent {
                found.push(interface.clone());
            }
            current = class.parent_class();
        }
        found
    }

    /// Check if an interface on the chain is, or extends, `interface`
    pub fn implements(&self, interface: &Interface) -> bool {
        self.interfaces().iter().any(|i| i.extends(interface))
    }

    /// Effective property by name
    pub fn property(&self, name: &str) -> Option<&Arc<Property>> {
        self.0.index.get(name).map(|&i| &self.0.properties[i])
    }

    /// Effective property table, in declaration order
    pub fn properties(&self) -> &[Arc<Property>] {
        &self.0.properties
    }

    /// Properties declared on this class itself
    pub fn own_properties(&self) -> &[Arc<Property>] {
        &self.0.own
    }

    /// Method by name, including inherited ones
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.0.methods.get(name)
    }

    /// Names of all methods, including inherited ones
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build an instance from a record, another instance (copy
    /// construction), or nothing
    pub fn construct(&self, init: Value) -> MooseResult<Instance> {
        match init {
            Value::Undefined | Value::Null => self.new_instance(Record::new()),
            Value::Record(record) => self.new_instance(record),
            Value::Object(instance) => self.new_instance(instance.to_record()),
            other => Err(MooseError::CannotConvert {
                from: other.type_name(),
                to: self.name().to_string(),
            }),
        }
    }

    /// Build an instance from initial values
    pub fn new_instance(&self, init: Record) -> MooseResult<Instance> {
        for interface in self.interfaces() {
            interface.check(self)?;
        }

        let instance = Instance::allocate(self.clone());
        self.initialize(&instance, &init, self)?;

        if self.is_final() {
            if let Some(unknown) = init.keys().find(|key| self.property(key).is_none()) {
                return Err(MooseError::UnknownParameter {
                    parameter: unknown.to_string(),
                    class: self.name().to_string(),
                });
            }
        } else {
            for (key, value) in init.iter() {
                if self.property(key).is_none() {
                    instance.store_extra(key, value.clone());
                }
            }
        }

        Ok(instance)
    }

    /// Run this level's half of construction for `concrete`
    fn initialize(&self, instance: &Instance, init: &Record, concrete: &Class) -> MooseResult<()> {
        if let Some(parent) = self.parent_class() {
            parent.initialize(instance, init, concrete)?;
        }

        // Own properties overridden further down are initialized there
        let active: Vec<&Arc<Property>> = self
            .0
            .own
            .iter()
            .filter(|p| {
                concrete
                    .property(p.name())
                    .map_or(false, |effective| Arc::ptr_eq(effective, *p))
            })
            .collect();

        for property in &active {
            let given = init.get(property.name()).cloned().unwrap_or_default();
            let value = property.check_initial(given, concrete.name())?;
            instance.store(property.name(), value);
        }

        for property in &active {
            let current = instance.stored(property.name());
            property.run_trigger(instance, &current, &Value::Undefined)?;
        }

        Ok(())
    }

    /// Build an instance from its JSON form
    pub fn from_json(&self, json: serde_json::Value) -> MooseResult<Instance> {
        self.construct(Value::from_json(json))
    }

    /// Build an instance from JSON text
    pub fn from_json_str(&self, text: &str) -> MooseResult<Instance> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MooseError::Custom(e.into()))?;
        self.from_json(json)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .field("properties", &self.0.properties)
            .field("is_final", &self.0.is_final)
            .finish()
    }
}
