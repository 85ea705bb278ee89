//! Metadata export
//!
//! Walks a type's declarations and produces a plain [`TypeDescriptor`]
//! tree, suitable for schema export or JSON output. Hidden attributes are
//! left out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::property::Access;
use crate::ty::Type;
use crate::value::Value;

/// Serializable description of a type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDescriptor {
    /// Built-in kind
    Primitive {
        /// Kind name
        name: String,
    },
    /// Declared class
    Class {
        /// Class name
        name: String,
        /// Enumerable attributes of the effective table
        properties: BTreeMap<String, PropertyDescriptor>,
    },
    /// Typed array
    Array {
        /// Array type name
        name: String,
        /// Element type
        #[serde(rename = "elementType")]
        element_type: Box<TypeDescriptor>,
    },
    /// Typed map
    Map {
        /// Map type name
        name: String,
        /// Key type
        #[serde(rename = "keyType")]
        key_type: Box<TypeDescriptor>,
        /// Value type
        #[serde(rename = "elementType")]
        element_type: Box<TypeDescriptor>,
    },
    /// Enumeration
    Enum {
        /// Enum name
        name: String,
        /// Allowed values
        values: Vec<Value>,
    },
    /// Interface
    Interface {
        /// Interface name
        name: String,
        /// Required method names
        methods: Vec<String>,
        /// Required property types
        properties: BTreeMap<String, TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Name of the described type
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Primitive { name }
            | TypeDescriptor::Class { name, .. }
            | TypeDescriptor::Array { name, .. }
            | TypeDescriptor::Map { name, .. }
            | TypeDescriptor::Enum { name, .. }
            | TypeDescriptor::Interface { name, .. } => name,
        }
    }

    /// JSON form of the tree
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Serializable description of one class attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// `ro` or `rw`
    pub access_mode: Access,
    /// Declared type
    pub value_type: TypeDescriptor,
    /// Whether the attribute may never be absent
    pub required: bool,
}

/// Describe `ty`; nothing in, nothing out
pub fn serialize(ty: Option<&Type>) -> Option<TypeDescriptor> {
    ty.map(Type::describe)
}

impl Type {
    /// Describe this type as a descriptor tree
    pub fn describe(&self) -> TypeDescriptor {
        match self {
            Type::Array(array) => TypeDescriptor::Array {
                name: array.name().to_string(),
                element_type: Box::new(array.element_type().describe()),
            },
            Type::Map(map) => TypeDescriptor::Map {
                name: map.name().to_string(),
                key_type: Box::new(map.key_type().describe()),
                element_type: Box::new(map.value_type().describe()),
            },
            Type::Class(class) => TypeDescriptor::Class {
                name: class.name().to_string(),
                properties: class
                    .properties()
                    .iter()
                    .filter(|p| p.is_enumerable())
                    .map(|p| {
                        let descriptor = PropertyDescriptor {
                            access_mode: p.access(),
                            value_type: p.isa().describe(),
                            required: p.is_required(),
                        };
                        (p.name().to_string(), descriptor)
                    })
                    .collect(),
            },
            Type::Enum(e) => TypeDescriptor::Enum {
                name: e.name().to_string(),
                values: e.values().to_vec(),
            },
            Type::Interface(interface) => TypeDescriptor::Interface {
                name: interface.name().to_string(),
                methods: interface.methods().to_vec(),
                properties: interface
                    .properties()
                    .iter()
                    .map(|(name, isa)| (name.clone(), isa.describe()))
                    .collect(),
            },
            primitive => TypeDescriptor::Primitive {
                name: primitive.name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_in_nothing_out() {
        assert!(serialize(None).is_none());
    }

    #[test]
    fn test_primitive_json() {
        let json = Type::Date.describe().to_json();
        assert_eq!(json, serde_json::json!({ "kind": "primitive", "name": "Date" }));
    }
}
