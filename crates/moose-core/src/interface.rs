//! Structural interfaces
//!
//! An [`Interface`] lists required method names and required
//! `(property, type)` pairs. Classes opt in by extending it; conformance is
//! checked on a class's first instantiation and remembered per class, so
//! later instantiations skip the check entirely.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::class::{Class, ClassId};
use crate::error::{MooseError, MooseResult};
use crate::instance::Instance;
use crate::ty::Type;
use crate::value::Value;

/// Builder for interface definitions
pub struct InterfaceBuilder {
    name: String,
    parent: Option<Interface>,
    methods: Vec<String>,
    properties: Vec<(String, Type)>,
}

impl InterfaceBuilder {
    /// Start an interface definition
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceBuilder {
            name: name.into(),
            parent: None,
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Accumulate the requirements of another interface
    pub fn extends(mut self, parent: &Interface) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Require a method
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.push(name.into());
        self
    }

    /// Require a required property of `isa` or one of its subtypes
    pub fn property(mut self, name: impl Into<String>, isa: impl Into<Type>) -> Self {
        self.properties.push((name.into(), isa.into()));
        self
    }

    /// Freeze the interface
    pub fn build(self) -> Interface {
        let (mut methods, mut properties) = match &self.parent {
            Some(parent) => (parent.0.methods.clone(), parent.0.properties.clone()),
            None => (Vec::new(), Vec::new()),
        };

        for method in self.methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        for (name, isa) in self.properties {
            match properties.iter_mut().find(|(n, _)| *n == name) {
                Some((_, slot)) => *slot = isa,
                None => properties.push((name, isa)),
            }
        }

        tracing::debug!(
            interface = %self.name,
            methods = methods.len(),
            properties = properties.len(),
            "defined interface"
        );

        Interface(Arc::new(InterfaceDef {
            name: self.name,
            parent: self.parent,
            methods,
            properties,
            conforming: Mutex::new(FxHashSet::default()),
            checks: AtomicUsize::new(0),
        }))
    }
}

struct InterfaceDef {
    name: String,
    parent: Option<Interface>,
    /// Accumulated over the `extends` chain
    methods: Vec<String>,
    properties: Vec<(String, Type)>,
    conforming: Mutex<FxHashSet<ClassId>>,
    checks: AtomicUsize,
}

/// Interface handle
#[derive(Clone)]
pub struct Interface(Arc<InterfaceDef>);

impl Interface {
    /// Interface name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Interface) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Parent interface, if any
    pub fn parent(&self) -> Option<&Interface> {
        self.0.parent.as_ref()
    }

    /// Check if this interface is `other` or extends it
    pub fn extends(&self, other: &Interface) -> bool {
        let mut current = Some(self);
        while let Some(interface) = current {
            if interface.ptr_eq(other) {
                return true;
            }
            current = interface.parent();
        }
        false
    }

    /// Required method names, inherited ones included
    pub fn methods(&self) -> &[String] {
        &self.0.methods
    }

    /// Required properties and their types, inherited ones included
    pub fn properties(&self) -> &[(String, Type)] {
        &self.0.properties
    }

    /// Interfaces are never instantiated
    pub fn construct(&self, _init: Value) -> MooseResult<Instance> {
        Err(MooseError::InterfaceDirectlyInvoked {
            interface: self.name().to_string(),
        })
    }

    /// Number of conformance checks actually performed
    pub fn check_count(&self) -> usize {
        self.0.checks.load(Ordering::Relaxed)
    }

    /// Verify that `class` conforms; each class is checked at most once
    /// successfully
    ///
    /// # Errors
    ///
    /// - `MissingInterfaceMethod` if a required method is absent
    /// - `MissingInterfaceProperty` if a property is not declared
    /// - `OptionalInterfaceProperty` if a property is declared but optional
    /// - `InterfaceTypeMismatch` if a property's type is not the required
    ///   type or a subtype of it
    pub fn check(&self, class: &Class) -> MooseResult<()> {
        let mut conforming = self.0.conforming.lock();
        if conforming.contains(&class.id()) {
            return Ok(());
        }

        self.0.checks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(interface = %self.name(), class = %class.name(), "checking conformance");

        for method in &self.0.methods {
            if class.method(method).is_none() {
                return Err(MooseError::MissingInterfaceMethod {
                    method: method.clone(),
                    class: class.name().to_string(),
                });
            }
        }

        for (name, expected) in &self.0.properties {
            let property = class
                .property(name)
                .ok_or_else(|| MooseError::MissingInterfaceProperty {
                    property: name.clone(),
                    class: class.name().to_string(),
                })?;
            if !property.is_required() {
                return Err(MooseError::OptionalInterfaceProperty {
                    property: name.clone(),
                    class: class.name().to_string(),
                });
            }

            if !property.isa().is_subtype_of(expected) {
                return Err(MooseError::InterfaceTypeMismatch {
                    property: name.clone(),
                    class: class.name().to_string(),
                    expected: expected.name(),
                });
            }
        }

        conforming.insert(class.id());
        Ok(())
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.0.name)
            .field("methods", &self.0.methods)
            .field("properties", &self.0.properties)
            .finish()
    }
}
