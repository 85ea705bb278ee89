//! Type references
//!
//! A [`Type`] names what an attribute, collection element or method channel
//! holds. Built-in kinds are unit variants; declared kinds carry the shared
//! definition handle produced at declaration time.

use std::fmt;

use crate::array::ArrayClass;
use crate::class::Class;
use crate::enumeration::Enum;
use crate::interface::Interface;
use crate::map::MapClass;
use crate::value::Value;

/// Target of validation and coercion
#[derive(Debug, Clone)]
pub enum Type {
    /// Untyped: any present value, stored by reference unchanged
    Any,
    /// `true`/`false`
    Boolean,
    /// IEEE 754 double
    Number,
    /// Text
    String,
    /// Bytes
    Buffer,
    /// Point in time
    Date,
    /// Invocable value
    Function,
    /// Raw untyped sequence; never a coercion target
    List,
    /// Homogeneous typed array
    Array(ArrayClass),
    /// Key/value typed map
    Map(MapClass),
    /// Declared class
    Class(Class),
    /// Structural interface
    Interface(Interface),
    /// Closed set of allowed values
    Enum(Enum),
}

impl Type {
    /// Diagnostic and serialization name
    pub fn name(&self) -> String {
        match self {
            Type::Any => "Object".to_string(),
            Type::Boolean => "Boolean".to_string(),
            Type::Number => "Number".to_string(),
            Type::String => "String".to_string(),
            Type::Buffer => "Buffer".to_string(),
            Type::Date => "Date".to_string(),
            Type::Function => "Function".to_string(),
            Type::List => "Array".to_string(),
            Type::Array(array) => array.name().to_string(),
            Type::Map(map) => map.name().to_string(),
            Type::Class(class) => class.name().to_string(),
            Type::Interface(interface) => interface.name().to_string(),
            Type::Enum(e) => e.name().to_string(),
        }
    }

    /// Check if this is one of the built-in scalar kinds
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Any
                | Type::Boolean
                | Type::Number
                | Type::String
                | Type::Buffer
                | Type::Date
                | Type::Function
                | Type::List
        )
    }

    /// Check if `value` already is an instance of this type
    ///
    /// Values that pass are returned unchanged by coercion, preserving
    /// identity for shared handles.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Undefined | Value::Null) => false,
            (Type::Any, _) => true,
            (Type::Boolean, Value::Bool(_)) => true,
            (Type::Number, Value::Number(_)) => true,
            (Type::String, Value::String(_)) => true,
            (Type::Buffer, Value::Buffer(_)) => true,
            (Type::Date, Value::Date(_)) => true,
            (Type::Function, Value::Function(_)) => true,
            (Type::List, Value::List(_)) => true,
            (Type::Array(class), Value::Array(array)) => array.class().ptr_eq(class),
            (Type::Map(class), Value::Map(map)) => map.class().ptr_eq(class),
            (Type::Class(class), Value::Object(instance)) => instance.class().is_a(class),
            (Type::Interface(interface), Value::Object(instance)) => {
                instance.class().implements(interface)
            }
            (Type::Enum(e), v) => e.allows(v),
            _ => false,
        }
    }

    /// Check if this type is a subtype of `sup` (self <: sup)
    ///
    /// Reflexive; classes are subtypes of their ancestors and of every
    /// interface on their chain; collections are covariant.
    pub fn is_subtype_of(&self, sup: &Type) -> bool {
        match (self, sup) {
            // Everything is a subtype of the untyped kind
            (_, Type::Any) => true,

            (Type::Boolean, Type::Boolean)
            | (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Buffer, Type::Buffer)
            | (Type::Date, Type::Date)
            | (Type::Function, Type::Function)
            | (Type::List, Type::List) => true,

            // Array subtyping: T[] <: U[] if T <: U
            (Type::Array(a1), Type::Array(a2)) => {
                a1.ptr_eq(a2) || a1.element_type().is_subtype_of(a2.element_type())
            }

            // Map subtyping: keys and values both covariant
            (Type::Map(m1), Type::Map(m2)) => {
                m1.ptr_eq(m2)
                    || (m1.key_type().is_subtype_of(m2.key_type())
                        && m1.value_type().is_subtype_of(m2.value_type()))
            }

            // Class subtyping (nominal): only through extends
            (Type::Class(c1), Type::Class(c2)) => c1.is_a(c2),

            // Class <: Interface through the inheritance chain
            (Type::Class(c), Type::Interface(i)) => c.implements(i),

            (Type::Interface(i1), Type::Interface(i2)) => i1.extends(i2),

            (Type::Enum(e1), Type::Enum(e2)) => e1.ptr_eq(e2),

            _ => false,
        }
    }
}

/// Identity for declared kinds, structure for collections
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Array(a1), Type::Array(a2)) => {
                a1.ptr_eq(a2) || a1.element_type() == a2.element_type()
            }
            (Type::Map(m1), Type::Map(m2)) => {
                m1.ptr_eq(m2)
                    || (m1.key_type() == m2.key_type() && m1.value_type() == m2.value_type())
            }
            (Type::Class(c1), Type::Class(c2)) => c1.ptr_eq(c2),
            (Type::Interface(i1), Type::Interface(i2)) => i1.ptr_eq(i2),
            (Type::Enum(e1), Type::Enum(e2)) => e1.ptr_eq(e2),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<ArrayClass> for Type {
    fn from(array: ArrayClass) -> Self {
        Type::Array(array)
    }
}

impl From<MapClass> for Type {
    fn from(map: MapClass) -> Self {
        Type::Map(map)
    }
}

impl From<Class> for Type {
    fn from(class: Class) -> Self {
        Type::Class(class)
    }
}

impl From<&Class> for Type {
    fn from(class: &Class) -> Self {
        Type::Class(class.clone())
    }
}

impl From<Interface> for Type {
    fn from(interface: Interface) -> Self {
        Type::Interface(interface)
    }
}

impl From<Enum> for Type {
    fn from(e: Enum) -> Self {
        Type::Enum(e)
    }
}

/// Type position of a declaration: a plain type, or the single-element
/// sequence shorthand meaning "typed array of this type"
#[derive(Debug, Clone)]
pub enum TypeSpec {
    /// Plain type reference
    Type(Type),
    /// Sequence shorthand; must hold exactly one element type
    Sequence(Vec<Type>),
}

impl TypeSpec {
    /// Shorthand for a typed array of `element`
    pub fn array_of(element: impl Into<Type>) -> Self {
        TypeSpec::Sequence(vec![element.into()])
    }
}

macro_rules! type_spec_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for TypeSpec {
                fn from(ty: $source) -> Self {
                    TypeSpec::Type(ty.into())
                }
            }
        )+
    };
}

type_spec_from!(Type, ArrayClass, MapClass, Class, &Class, Interface, Enum);
