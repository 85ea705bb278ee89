//! Moose Core
//!
//! A runtime schema-validated object model. Classes are declared by naming
//! their attributes (accessor mode, type, requiredness, default, trigger);
//! instances enforce those contracts on construction and on every later
//! read, write and delete, rolling back any change a trigger rejects.
//!
//! On top of the attribute model sit typed arrays and maps, structural
//! interfaces, enums, metadata export and validated methods.
//!
//! ```ignore
//! use moose_core::{record, ClassBuilder, PropertySpec, Type};
//!
//! let person = ClassBuilder::new("Person")
//!     .has("name", PropertySpec::rw(Type::String).required())
//!     .has("age", PropertySpec::rw(Type::Number).default_value(0))
//!     .final_class()
//!     .build()?;
//!
//! let byron = person.new_instance(record! { "name" => "Byron", "age" => "27" })?;
//! assert_eq!(byron.get("age")?, 27.into());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod array;
pub mod class;
pub mod coerce;
pub mod enumeration;
pub mod error;
pub mod instance;
pub mod interface;
pub mod json;
pub mod map;
pub mod method;
pub mod property;
pub mod serialize;
pub mod ty;
pub mod value;

pub use array::{ArrayClass, ArraySpec, ArrayTrigger, TypedArray};
pub use class::{Class, ClassBuilder, ClassId, Parent};
pub use coerce::coerce;
pub use enumeration::Enum;
pub use error::{MooseError, MooseResult};
pub use instance::Instance;
pub use interface::{Interface, InterfaceBuilder};
pub use map::{MapClass, MapSpec, MapTrigger, TypedMap};
pub use method::{Method, MethodSpec, Signature};
pub use property::{Access, DefaultValue, Property, PropertySpec, PropertyTrigger};
pub use serialize::{serialize, PropertyDescriptor, TypeDescriptor};
pub use ty::{Type, TypeSpec};
pub use value::{Function, Record, Value};
