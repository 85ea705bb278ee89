//! Validated methods
//!
//! A [`Method`] wraps a body so that its single argument and its result go
//! through the same machinery as attributes. A field-set signature compiles
//! into a closed class named `input` (or `output`); a type signature is
//! plain coercion. Bodies are either immediate or deferred; a deferred body
//! is awaited once before its result is validated.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::class::{Class, ClassBuilder};
use crate::coerce::coerce;
use crate::error::{MooseError, MooseResult};
use crate::instance::Instance;
use crate::property::{Access, Property, PropertySpec};
use crate::ty::{Type, TypeSpec};
use crate::value::Value;

/// Immediate body: `(receiver, argument) -> result`
pub type SyncBody = Arc<dyn Fn(Option<&Instance>, Value) -> MooseResult<Value> + Send + Sync>;

/// Deferred body returning a future result
pub type DeferredBody =
    Arc<dyn Fn(Option<Instance>, Value) -> BoxFuture<'static, MooseResult<Value>> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Sync(SyncBody),
    Deferred(DeferredBody),
}

/// Shape of a method's argument or result
#[derive(Clone)]
pub enum Signature {
    /// Named fields; compiled into a closed class
    Fields(Vec<(String, PropertySpec)>),
    /// A single value of the given type
    Type(TypeSpec),
}

impl Signature {
    /// Field-set signature; fields without an accessor default to read-only
    pub fn fields<I, K, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<PropertySpec>,
    {
        Signature::Fields(
            fields
                .into_iter()
                .map(|(name, spec)| (name.into(), spec.into()))
                .collect(),
        )
    }
}

impl From<Type> for Signature {
    fn from(ty: Type) -> Self {
        Signature::Type(TypeSpec::Type(ty))
    }
}

impl From<TypeSpec> for Signature {
    fn from(spec: TypeSpec) -> Self {
        Signature::Type(spec)
    }
}

impl From<Class> for Signature {
    fn from(class: Class) -> Self {
        Signature::Type(TypeSpec::Type(Type::Class(class)))
    }
}

/// Declaration of a method
pub struct MethodSpec {
    name: String,
    input: Option<Signature>,
    output: Option<Signature>,
    body: Body,
}

impl MethodSpec {
    /// Method with an immediate body
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Option<&Instance>, Value) -> MooseResult<Value> + Send + Sync + 'static,
    {
        MethodSpec {
            name: name.into(),
            input: None,
            output: None,
            body: Body::Sync(Arc::new(body)),
        }
    }

    /// Method whose body completes later
    pub fn deferred<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Option<Instance>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MooseResult<Value>> + Send + 'static,
    {
        MethodSpec {
            name: name.into(),
            input: None,
            output: None,
            body: Body::Deferred(Arc::new(move |this, arg| body(this, arg).boxed())),
        }
    }

    /// Validate the argument against `signature`
    pub fn input(mut self, signature: impl Into<Signature>) -> Self {
        self.input = Some(signature.into());
        self
    }

    /// Validate the result against `signature`
    pub fn output(mut self, signature: impl Into<Signature>) -> Self {
        self.output = Some(signature.into());
        self
    }
}

#[derive(Clone)]
enum Channel {
    Class(Class),
    Type(Type),
}

impl Channel {
    fn compile(label: &str, signature: Signature) -> MooseResult<Self> {
        match signature {
            Signature::Fields(fields) => {
                let mut builder = ClassBuilder::new(label).final_class();
                for (name, spec) in fields {
                    let spec = if spec.has_access() {
                        spec
                    } else {
                        spec.access(Access::ReadOnly)
                    };
                    builder = builder.has(name, spec);
                }
                Ok(Channel::Class(builder.build()?))
            }
            Signature::Type(spec) => {
                // Sequence shorthand desugars the same way as for attributes
                let property = Property::new(label, PropertySpec::ro(spec))?;
                Ok(Channel::Type(property.isa().clone()))
            }
        }
    }

    fn apply(&self, value: Value) -> MooseResult<Value> {
        match self {
            Channel::Class(class) => class.construct(value).map(Value::Object),
            Channel::Type(ty) => coerce(ty, value),
        }
    }
}

struct MethodDef {
    name: String,
    input: Option<Channel>,
    output: Option<Channel>,
    body: Body,
}

/// Wrapped, validated method
#[derive(Clone)]
pub struct Method(Arc<MethodDef>);

impl Method {
    /// Compile the signatures and wrap the body
    ///
    /// # Errors
    ///
    /// Any descriptor error raised while compiling the signatures.
    pub fn wrap(spec: MethodSpec) -> MooseResult<Self> {
        let input = spec
            .input
            .map(|signature| Channel::compile("input", signature))
            .transpose()?;
        let output = spec
            .output
            .map(|signature| Channel::compile("output", signature))
            .transpose()?;

        tracing::debug!(
            method = %spec.name,
            deferred = matches!(spec.body, Body::Deferred(_)),
            "wrapped method"
        );

        Ok(Method(Arc::new(MethodDef {
            name: spec.name,
            input,
            output,
            body: spec.body,
        })))
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether the body completes later
    pub fn is_deferred(&self) -> bool {
        matches!(self.0.body, Body::Deferred(_))
    }

    /// Class compiled from a field-set input signature
    pub fn input_class(&self) -> Option<&Class> {
        match &self.0.input {
            Some(Channel::Class(class)) => Some(class),
            _ => None,
        }
    }

    /// Type the result is validated against
    pub fn output_type(&self) -> Option<Type> {
        match &self.0.output {
            Some(Channel::Class(class)) => Some(Type::Class(class.clone())),
            Some(Channel::Type(ty)) => Some(ty.clone()),
            None => None,
        }
    }

    /// Call without receiver
    pub fn call(&self, arg: impl Into<Value>) -> MooseResult<Value> {
        self.invoke(None, arg.into())
    }

    /// Call with `this` as receiver
    pub fn call_on(&self, this: &Instance, arg: impl Into<Value>) -> MooseResult<Value> {
        self.invoke(Some(this), arg.into())
    }

    /// Call without receiver, awaiting a deferred body
    pub async fn call_async(&self, arg: impl Into<Value>) -> MooseResult<Value> {
        self.invoke_async(None, arg.into()).await
    }

    /// Call with `this` as receiver, awaiting a deferred body
    pub async fn call_on_async(&self, this: &Instance, arg: impl Into<Value>) -> MooseResult<Value> {
        self.invoke_async(Some(this.clone()), arg.into()).await
    }

    fn validate_input(&self, arg: Value) -> MooseResult<Value> {
        match &self.0.input {
            Some(channel) => channel.apply(arg),
            None => Ok(arg),
        }
    }

    fn validate_output(&self, result: Value) -> MooseResult<Value> {
        match &self.0.output {
            Some(channel) => channel.apply(result),
            None => Ok(result),
        }
    }

    fn invoke(&self, this: Option<&Instance>, arg: Value) -> MooseResult<Value> {
        let body = match &self.0.body {
            Body::Sync(body) => body,
            Body::Deferred(_) => {
                return Err(MooseError::DeferredMethod {
                    method: self.name().to_string(),
                })
            }
        };
        let input = self.validate_input(arg)?;
        let result = body(this, input)?;
        self.validate_output(result)
    }

    async fn invoke_async(&self, this: Option<Instance>, arg: Value) -> MooseResult<Value> {
        let input = self.validate_input(arg)?;
        let result = match &self.0.body {
            Body::Sync(body) => body(this.as_ref(), input)?,
            Body::Deferred(body) => body(this, input).await?,
        };
        self.validate_output(result)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.0.name)
            .field("input", &self.input_class().map(Class::name))
            .field("output", &self.output_type().map(|t| t.name()))
            .field("deferred", &self.is_deferred())
            .finish()
    }
}
