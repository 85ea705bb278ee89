//! Enumerations: a named, closed set of allowed values

use std::fmt;
use std::sync::Arc;

use crate::error::{MooseError, MooseResult};
use crate::value::Value;

struct EnumDef {
    name: String,
    values: Vec<Value>,
}

/// Enum handle
#[derive(Clone)]
pub struct Enum(Arc<EnumDef>);

impl Enum {
    /// Declare an enum from its allowed values
    pub fn define<I, T>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let def = EnumDef {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        };
        tracing::debug!(enumeration = %def.name, values = def.values.len(), "defined enum");
        Enum(Arc::new(def))
    }

    /// Declare an unnamed enum
    pub fn of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::define("enum", values)
    }

    /// Enum name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Allowed values, in declaration order
    pub fn values(&self) -> &[Value] {
        &self.0.values
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Enum) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Check if `value` is one of the allowed values (no conversion)
    pub fn allows(&self, value: &Value) -> bool {
        self.0.values.iter().any(|allowed| allowed == value)
    }

    /// Return `value` unchanged if allowed
    ///
    /// # Errors
    ///
    /// `InvalidEnumValue` for anything outside the allowed set.
    pub fn construct(&self, value: Value) -> MooseResult<Value> {
        if self.allows(&value) {
            Ok(value)
        } else {
            Err(MooseError::InvalidEnumValue {
                value: value.to_string(),
                name: self.name().to_string(),
            })
        }
    }
}

impl fmt::Debug for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enum")
            .field("name", &self.0.name)
            .field("values", &self.0.values)
            .finish()
    }
}
