//! Object model errors

use thiserror::Error;

/// Errors raised while declaring types or validating values against them
#[derive(Debug, Error)]
pub enum MooseError {
    /// An absent value (undefined/null) reached a coercion
    #[error("Value undefined")]
    UndefinedValue,

    /// Numeric coercion produced not-a-number
    #[error("{from} cannot be converted to a number")]
    InvalidNumber {
        /// Type name of the rejected value
        from: String,
    },

    /// Temporal coercion could not parse the value
    #[error("{from} cannot be converted to a date")]
    InvalidDate {
        /// Type name of the rejected value
        from: String,
    },

    /// No conversion exists between the two types
    #[error("Cannot convert {from} to {to}")]
    CannotConvert {
        /// Type name of the rejected value
        from: String,
        /// Target type name
        to: String,
    },

    /// Property declared without an accessor mode
    #[error("No accessor defined for {name}, use ReadOnly or ReadWrite")]
    MalformedDescriptor {
        /// Property name
        name: String,
    },

    /// Property declared with an empty name
    #[error("No name defined for property")]
    MissingName,

    /// Sequence shorthand without exactly one element type
    #[error("Invalid array type for {name}")]
    InvalidArrayType {
        /// Property or collection name
        name: String,
    },

    /// Required property left absent
    #[error("Property \"{property}\" of \"{class}\" required")]
    RequiredPropertyMissing {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Write to a read-only property
    #[error("Property \"{property}\" of \"{class}\" is read only")]
    ReadOnlyViolation {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Mutation of a read-only typed collection
    #[error("{kind} is read-only")]
    ReadOnlyCollection {
        /// `Array` or `Map`
        kind: &'static str,
    },

    /// Delete of a required property
    #[error("Cannot delete required property \"{property}\" of class \"{class}\"")]
    CannotDeleteRequired {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Delete of a single typed array element
    #[error("Cannot delete typed array elements")]
    CannotDeleteElement,

    /// Typed array write past the end of the array
    #[error("Index {index} out of bounds for typed array of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Current length
        len: usize,
    },

    /// Access to an undeclared property of a closed class
    #[error("No such property \"{property}\" of \"{class}\"")]
    UnknownProperty {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Undeclared initial value passed to a closed class
    #[error("Unknown parameter \"{parameter}\" passed to \"{class}\"")]
    UnknownParameter {
        /// Parameter name
        parameter: String,
        /// Concrete class name
        class: String,
    },

    /// Call of a method the class does not declare
    #[error("No such method \"{method}\" of \"{class}\"")]
    UnknownMethod {
        /// Method name
        method: String,
        /// Concrete class name
        class: String,
    },

    /// Synchronous call of a method whose body is deferred
    #[error("Method \"{method}\" has a deferred body and must be awaited")]
    DeferredMethod {
        /// Method name
        method: String,
    },

    /// Class lacks a method its interface requires
    #[error("Interface member \"{method}\" not defined in \"{class}\"")]
    MissingInterfaceMethod {
        /// Method name
        method: String,
        /// Concrete class name
        class: String,
    },

    /// Class does not declare a property its interface requires
    #[error("Property \"{property}\" not defined in \"{class}\"")]
    MissingInterfaceProperty {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Class declares an interface property but leaves it optional
    #[error("Property \"{property}\" is not required in \"{class}\" to conform to interface")]
    OptionalInterfaceProperty {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
    },

    /// Class property type incompatible with its interface
    #[error("Property \"{property}\" of \"{class}\" must be type \"{expected}\" to conform to interface")]
    InterfaceTypeMismatch {
        /// Property name
        property: String,
        /// Concrete class name
        class: String,
        /// Type the interface expects
        expected: String,
    },

    /// Attempt to instantiate an interface
    #[error("Interface \"{interface}\" cannot be directly invoked")]
    InterfaceDirectlyInvoked {
        /// Interface name
        interface: String,
    },

    /// Value outside an enum's allowed set
    #[error("Invalid input \"{value}\" for {name}")]
    InvalidEnumValue {
        /// Display form of the rejected value
        value: String,
        /// Enum name
        name: String,
    },

    /// Caller-defined failure raised from a trigger or method body
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl MooseError {
    /// Build a caller-defined error from a message
    pub fn custom(message: impl std::fmt::Display) -> Self {
        MooseError::Custom(anyhow::anyhow!("{}", message))
    }
}

/// Object model result
pub type MooseResult<T> = Result<T, MooseError>;
