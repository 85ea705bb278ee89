//! Property descriptors
//!
//! A [`PropertySpec`] is the declaration a caller writes for one attribute;
//! [`Property`] is the validated, immutable descriptor it compiles into.
//! Descriptors own the per-attribute half of the validation pipeline
//! (requiredness, writability, coercion, defaulting, triggers); the class
//! engine sequences them and performs rollback.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::array::{ArrayClass, ArraySpec};
use crate::coerce::coerce;
use crate::error::{MooseError, MooseResult};
use crate::instance::Instance;
use crate::ty::{Type, TypeSpec};
use crate::value::Value;

/// Accessor mode of an attribute or collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    /// Set at construction only
    #[serde(rename = "ro")]
    ReadOnly,
    /// Writable after construction
    #[serde(rename = "rw")]
    ReadWrite,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::ReadOnly => write!(f, "ro"),
            Access::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Side effect run after a successful change: `(owner, new, old, name)`
///
/// Returning an error rolls the change back.
pub type PropertyTrigger =
    Arc<dyn Fn(&Instance, &Value, &Value, &str) -> MooseResult<()> + Send + Sync>;

/// Default of an attribute
#[derive(Clone)]
pub enum DefaultValue {
    /// Literal value, cloned into each instance
    Literal(Value),
    /// Producer invoked once per instance
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => write!(f, "Producer"),
        }
    }
}

/// Declaration of one attribute
#[derive(Clone, Default)]
pub struct PropertySpec {
    access: Option<Access>,
    isa: Option<TypeSpec>,
    required: bool,
    default: Option<DefaultValue>,
    enumerable: Option<bool>,
    trigger: Option<PropertyTrigger>,
}

impl PropertySpec {
    /// Create an empty declaration (no accessor, untyped, optional)
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only attribute of the given type
    pub fn ro(isa: impl Into<TypeSpec>) -> Self {
        Self::new().access(Access::ReadOnly).isa(isa)
    }

    /// Read-write attribute of the given type
    pub fn rw(isa: impl Into<TypeSpec>) -> Self {
        Self::new().access(Access::ReadWrite).isa(isa)
    }

    /// Set the accessor mode
    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    /// Set the value type
    pub fn isa(mut self, isa: impl Into<TypeSpec>) -> Self {
        self.isa = Some(isa.into());
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Literal default
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default computed per instance
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Hide from reflective enumeration and metadata
    pub fn hidden(self) -> Self {
        self.enumerable(false)
    }

    /// Set reflective visibility
    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Side effect run after each successful change
    pub fn trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(&Instance, &Value, &Value, &str) -> MooseResult<()> + Send + Sync + 'static,
    {
        self.trigger = Some(Arc::new(trigger));
        self
    }

    pub(crate) fn has_access(&self) -> bool {
        self.access.is_some()
    }
}

// A bare type declares a read-only, required attribute
macro_rules! property_spec_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for PropertySpec {
                fn from(isa: $source) -> Self {
                    PropertySpec::ro(isa).required()
                }
            }
        )+
    };
}

property_spec_from!(
    Type,
    TypeSpec,
    ArrayClass,
    crate::map::MapClass,
    crate::class::Class,
    &crate::class::Class,
    crate::interface::Interface,
    crate::enumeration::Enum,
);

/// Validated descriptor of one attribute
pub struct Property {
    name: String,
    access: Access,
    isa: Type,
    required: bool,
    default: Option<DefaultValue>,
    enumerable: bool,
    trigger: Option<PropertyTrigger>,
}

impl Property {
    /// Compile a declaration
    ///
    /// # Errors
    ///
    /// - `MissingName` if `name` is empty
    /// - `MalformedDescriptor` if no accessor mode was given
    /// - `InvalidArrayType` if a sequence shorthand does not hold exactly
    ///   one element type
    pub fn new(name: impl Into<String>, spec: PropertySpec) -> MooseResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MooseError::MissingName);
        }

        let access = spec
            .access
            .ok_or_else(|| MooseError::MalformedDescriptor { name: name.clone() })?;

        let isa = match spec.isa {
            None => Type::Any,
            Some(TypeSpec::Type(ty)) => ty,
            Some(TypeSpec::Sequence(types)) => {
                let [element]: [Type; 1] = types
                    .try_into()
                    .map_err(|_| MooseError::InvalidArrayType { name: name.clone() })?;
                // The shorthand array shares its owner's writability
                let class = ArrayClass::define(ArraySpec::new(element).access(access))
                    .map_err(|_| MooseError::InvalidArrayType { name: name.clone() })?;
                Type::Array(class)
            }
        };

        Ok(Property {
            name,
            access,
            isa,
            required: spec.required,
            default: spec.default,
            enumerable: spec.enumerable.unwrap_or(true),
            trigger: spec.trigger,
        })
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accessor mode
    pub fn access(&self) -> Access {
        self.access
    }

    /// Declared value type
    pub fn isa(&self) -> &Type {
        &self.isa
    }

    /// Whether the property may never be absent
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the property shows up in enumeration and metadata
    pub fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    /// Whether a trigger is attached
    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }

    /// Coerce a value to the declared type
    pub fn cast(&self, value: Value) -> MooseResult<Value> {
        coerce(&self.isa, value)
    }

    /// Evaluate the default for a new instance
    pub fn compute_default(&self) -> Value {
        match &self.default {
            Some(DefaultValue::Literal(value)) => value.clone(),
            Some(DefaultValue::Producer(producer)) => producer(),
            None => Value::Undefined,
        }
    }

    /// Reject an absent value for a required property
    pub fn validate_required(&self, value: &Value, owner: &str) -> MooseResult<()> {
        if self.required && value.is_absent() {
            return Err(MooseError::RequiredPropertyMissing {
                property: self.name.clone(),
                class: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Reject writes to a read-only property
    pub fn validate_writable(&self, owner: &str) -> MooseResult<()> {
        if self.access == Access::ReadOnly {
            return Err(MooseError::ReadOnlyViolation {
                property: self.name.clone(),
                class: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Reject deletion of a required property
    pub fn validate_deletable(&self, owner: &str) -> MooseResult<()> {
        if self.required {
            return Err(MooseError::CannotDeleteRequired {
                property: self.name.clone(),
                class: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Requiredness, then coercion of present values
    pub fn check(&self, value: Value, owner: &str) -> MooseResult<Value> {
        self.validate_required(&value, owner)?;
        if value.is_absent() {
            Ok(value)
        } else {
            self.cast(value)
        }
    }

    /// Check an initial value, falling back to the default
    pub fn check_initial(&self, value: Value, owner: &str) -> MooseResult<Value> {
        let value = if value.is_absent() {
            self.compute_default()
        } else {
            value
        };
        self.check(value, owner)
    }

    /// Check a post-construction write
    pub fn check_set(&self, value: Value, owner: &str) -> MooseResult<Value> {
        self.validate_writable(owner)?;
        self.check(value, owner)
    }

    /// Run the trigger, if any; failures propagate unchanged
    pub fn run_trigger(&self, owner: &Instance, value: &Value, old: &Value) -> MooseResult<()> {
        match &self.trigger {
            Some(trigger) => trigger(owner, value, old, &self.name),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("isa", &self.isa.name())
            .field("required", &self.required)
            .field("default", &self.default)
            .field("enumerable", &self.enumerable)
            .field("trigger", &self.trigger.is_some())
            .finish()
    }
}
