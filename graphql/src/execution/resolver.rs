use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use trellis::prelude::*;

use crate::schema::{ConstructionError, Schema, Strings, TypeDescriptor};

/// A failed attempt to bind a requested field to a capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// The resolver exposes no capability for the field.
    Missing,
    /// Several capabilities match the field once case is ignored.
    Ambiguous(Vec<String>),
}

/// Returned by capabilities that exist but are not implemented yet. The
/// engine reports it as a `NotImplemented` error on the field.
#[derive(Clone, Debug)]
pub struct NotImplemented(pub String);

impl fmt::Display for NotImplemented {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotImplemented {}

/// What a capability produced for a field.
#[derive(Clone)]
pub enum Resolved {
    Null,
    Leaf(r::Value),
    List(Vec<Resolved>),
    Object(Arc<dyn Resolver>),
}

impl Resolved {
    pub fn object(resolver: impl Resolver + 'static) -> Self {
        Resolved::Object(Arc::new(resolver))
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Resolved>,
    {
        Resolved::List(items.into_iter().map(Into::into).collect())
    }

    /// `Null` for `None`, the resolver object otherwise.
    pub fn optional(resolver: Option<impl Resolver + 'static>) -> Self {
        resolver.map_or(Resolved::Null, Resolved::object)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null)
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resolved::Null => write!(f, "Null"),
            Resolved::Leaf(value) => write!(f, "Leaf({})", value),
            Resolved::List(items) => f.debug_list().entries(items).finish(),
            Resolved::Object(resolver) => write!(f, "Object({})", resolver.type_name()),
        }
    }
}

macro_rules! impl_from_leaf {
    ($($T:ty),*) => {
        $(
            impl From<$T> for Resolved {
                fn from(value: $T) -> Self {
                    match value.into_value() {
                        r::Value::Null => Resolved::Null,
                        value => Resolved::Leaf(value),
                    }
                }
            }
        )+
    };
}

impl_from_leaf![r::Value, &str, String, i32, i64, usize, f64, bool];

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(items: Vec<T>) -> Self {
        Resolved::list(items)
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map_or(Resolved::Null, Into::into)
    }
}

/// The coerced arguments of a field, keyed by argument name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments(r::Object);

impl Arguments {
    pub fn new(values: r::Object) -> Self {
        Arguments(values)
    }

    pub fn into_inner(self) -> r::Object {
        self.0
    }
}

impl Deref for Arguments {
    type Target = r::Object;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ValueMap for Arguments {
    fn get_required<T: TryFromValue>(&self, key: &str) -> Result<T, anyhow::Error> {
        self.0.get_required(key)
    }

    fn get_optional<T: TryFromValue>(&self, key: &str) -> Result<Option<T>, anyhow::Error> {
        self.0.get_optional(key)
    }
}

/// A typed parameter structure built from the coerced arguments of a field.
pub trait FromArguments: Sized {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error>;
}

impl FromArguments for () {
    fn from_arguments(_: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(())
    }
}

impl FromArguments for Arguments {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(arguments.clone())
    }
}

/// Per-field information handed to capabilities.
#[derive(Clone, Debug)]
pub struct FieldContext {
    pub logger: Logger,
    /// The path of the field in the result.
    pub path: Vec<PathSegment>,
    /// Canceled when the request is abandoned or times out.
    pub cancel: CancelHandle,
}

pub type FieldFuture<'a> = BoxFuture<'a, Result<Resolved, anyhow::Error>>;

/// A value that stands in for an object, interface or union type during
/// execution and exposes one capability per field.
pub trait Resolver: Send + Sync {
    /// The name the resolver was registered under.
    fn type_name(&self) -> &str;

    /// Binds `field` to a capability, matching names case-insensitively,
    /// and invokes it.
    fn resolve_field<'a>(
        &'a self,
        field: &str,
        arguments: Arguments,
        ctx: FieldContext,
    ) -> Result<FieldFuture<'a>, BindError>;

    /// The concrete variant this value stands for, and the value to use
    /// for it. Values of abstract types must narrow to one of the variants
    /// the schema declares.
    fn narrow(&self) -> Option<(&str, &dyn Resolver)>;

    /// The names of all capabilities, as registered.
    fn capabilities(&self) -> Vec<&str>;
}

type Capability<T> =
    Box<dyn for<'a> Fn(&'a T, Arguments, FieldContext) -> FieldFuture<'a> + Send + Sync>;

enum Binding {
    Single(usize),
    Ambiguous(Vec<usize>),
}

/// The table of capabilities of a resolver type, built once per type.
pub struct Bindings<T> {
    type_name: &'static str,
    capabilities: Vec<(&'static str, Capability<T>)>,
    index: HashMap<String, Binding>,
}

impl<T: 'static> Bindings<T> {
    pub fn new(type_name: &'static str) -> Self {
        Bindings {
            type_name,
            capabilities: vec![],
            index: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registers a capability without arguments that cannot fail.
    pub fn field<F, R>(self, name: &'static str, f: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: Into<Resolved>,
    {
        self.register(name, move |object: &T, _: Arguments, _: FieldContext| {
            futures03::future::ready(Ok(f(object).into())).boxed()
        })
    }

    /// Registers a capability that takes arguments and may fail.
    pub fn field_with<F, A, R>(self, name: &'static str, f: F) -> Self
    where
        F: Fn(&T, A) -> Result<R, anyhow::Error> + Send + Sync + 'static,
        A: FromArguments,
        R: Into<Resolved>,
    {
        self.register(name, move |object: &T, arguments: Arguments, _: FieldContext| {
            let result = A::from_arguments(&arguments)
                .and_then(|arguments| f(object, arguments))
                .map(Into::into);
            futures03::future::ready(result).boxed()
        })
    }

    /// Registers an asynchronous capability.
    pub fn field_async<F>(self, name: &'static str, f: F) -> Self
    where
        F: for<'a> Fn(&'a T, Arguments, FieldContext) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    fn register<F>(mut self, name: &'static str, capability: F) -> Self
    where
        F: for<'a> Fn(&'a T, Arguments, FieldContext) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        let index = self.capabilities.len();
        self.capabilities.push((name, Box::new(capability)));

        let key = name.to_lowercase();
        let binding = match self.index.remove(&key) {
            None => Binding::Single(index),
            Some(Binding::Single(other)) => Binding::Ambiguous(vec![other, index]),
            Some(Binding::Ambiguous(mut others)) => {
                others.push(index);
                Binding::Ambiguous(others)
            }
        };
        self.index.insert(key, binding);
        self
    }

    fn bind(&self, field: &str) -> Result<&Capability<T>, BindError> {
        match self.index.get(&field.to_lowercase()) {
            None => Err(BindError::Missing),
            Some(Binding::Single(index)) => Ok(&self.capabilities[*index].1),
            Some(Binding::Ambiguous(indexes)) => Err(BindError::Ambiguous(
                indexes
                    .iter()
                    .map(|index| self.capabilities[*index].0.to_string())
                    .collect(),
            )),
        }
    }

    /// The registered names, grouped by the field they match, with
    /// ambiguous groups listing every colliding name.
    pub fn ambiguities(&self) -> Vec<Vec<&'static str>> {
        let mut groups: Vec<Vec<&'static str>> = self
            .index
            .values()
            .filter_map(|binding| match binding {
                Binding::Ambiguous(indexes) => Some(
                    indexes
                        .iter()
                        .map(|index| self.capabilities[*index].0)
                        .collect(),
                ),
                Binding::Single(_) => None,
            })
            .collect();
        groups.sort();
        groups
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(|(name, _)| *name).collect()
    }

    /// Whether `field` binds to exactly one capability.
    pub fn binds(&self, field: &str) -> bool {
        self.bind(field).is_ok()
    }
}

/// A statically known resolver type. Implementors get `Resolver` through
/// their binding table.
pub trait Object: Send + Sync + Sized + 'static {
    fn bindings() -> &'static Bindings<Self>;

    /// The concrete variant of the value. Plain object types are their own
    /// variant; sum types of several objects override this.
    fn narrow(&self) -> Option<(&str, &dyn Resolver)> {
        Some((Self::bindings().type_name(), self))
    }
}

impl<T: Object> Resolver for T {
    fn type_name(&self) -> &str {
        T::bindings().type_name()
    }

    fn resolve_field<'a>(
        &'a self,
        field: &str,
        arguments: Arguments,
        ctx: FieldContext,
    ) -> Result<FieldFuture<'a>, BindError> {
        T::bindings()
            .bind(field)
            .map(|capability| capability(self, arguments, ctx))
    }

    fn narrow(&self) -> Option<(&str, &dyn Resolver)> {
        Object::narrow(self)
    }

    fn capabilities(&self) -> Vec<&str> {
        T::bindings().names()
    }
}

/// Checks the binding table of a resolver type against the schema type it
/// is registered for. Ambiguous bindings always fail; a declared field
/// without a capability fails only when `strict` is set and is logged
/// otherwise. Interfaces and unions are resolved through narrowing, so
/// their tables may be empty.
pub fn verify_bindings<T: 'static>(
    logger: &Logger,
    schema: &Schema,
    bindings: &Bindings<T>,
    strict: bool,
) -> Result<(), ConstructionError> {
    let type_name = bindings.type_name();
    let declared: Vec<&str> = match schema.lookup(type_name) {
        Some(TypeDescriptor::Object(t)) => t.fields.keys().map(String::as_str).collect(),
        Some(TypeDescriptor::Interface(t)) => t.fields.keys().map(String::as_str).collect(),
        Some(TypeDescriptor::Union(_)) => vec![],
        _ => return Err(ConstructionError::UnknownResolverType(type_name.to_string())),
    };

    if let Some(names) = bindings.ambiguities().into_iter().next() {
        let field = names
            .first()
            .and_then(|name| {
                declared
                    .iter()
                    .find(|field| field.to_lowercase() == name.to_lowercase())
            })
            .or(names.first())
            .map(|name| name.to_string())
            .unwrap_or_default();
        return Err(ConstructionError::AmbiguousBinding(
            type_name.to_string(),
            field,
            Strings(names.into_iter().map(String::from).collect()),
        ));
    }

    if let Some(TypeDescriptor::Object(_)) = schema.lookup(type_name) {
        for field in declared.iter().filter(|field| !bindings.binds(field)) {
            if strict {
                return Err(ConstructionError::MissingCapability(
                    type_name.to_string(),
                    field.to_string(),
                ));
            }
            warn!(
                logger,
                "Field has no capability";
                "type" => type_name,
                "field" => *field,
                "code" => LogCode::UnboundCapability,
            );
        }
    }

    for name in bindings.names().into_iter().filter(|name| {
        !declared
            .iter()
            .any(|field| field.to_lowercase() == name.to_lowercase())
    }) {
        warn!(
            logger,
            "Capability does not correspond to any field";
            "type" => type_name,
            "capability" => name,
        );
    }

    Ok(())
}

/// A resolver whose capabilities are registered at runtime, for data whose
/// shape is only known when the program runs.
pub struct DynamicObject {
    type_name: String,
    capabilities: Vec<(String, DynamicCapability)>,
}

type DynamicCapability = Arc<
    dyn Fn(Arguments, FieldContext) -> BoxFuture<'static, Result<Resolved, anyhow::Error>>
        + Send
        + Sync,
>;

impl DynamicObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        DynamicObject {
            type_name: type_name.into(),
            capabilities: vec![],
        }
    }

    /// Adds a capability that always produces `value`.
    pub fn with_value(self, name: impl Into<String>, value: impl Into<Resolved>) -> Self {
        let value = value.into();
        self.with_field(name, move |_| Ok(value.clone()))
    }

    pub fn with_field<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arguments) -> Result<Resolved, anyhow::Error> + Send + Sync + 'static,
    {
        self.capabilities.push((
            name.into(),
            Arc::new(move |arguments: Arguments, _: FieldContext| {
                futures03::future::ready(f(arguments)).boxed()
            }),
        ));
        self
    }

    pub fn with_async_field<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arguments, FieldContext) -> BoxFuture<'static, Result<Resolved, anyhow::Error>>
            + Send
            + Sync
            + 'static,
    {
        self.capabilities.push((name.into(), Arc::new(f)));
        self
    }
}

impl Resolver for DynamicObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        field: &str,
        arguments: Arguments,
        ctx: FieldContext,
    ) -> Result<FieldFuture<'a>, BindError> {
        let matches: Vec<_> = self
            .capabilities
            .iter()
            .filter(|(name, _)| name.to_lowercase() == field.to_lowercase())
            .collect();
        match matches.as_slice() {
            [] => Err(BindError::Missing),
            [(_, capability)] => Ok(capability(arguments, ctx)),
            _ => Err(BindError::Ambiguous(
                matches.iter().map(|(name, _)| name.clone()).collect(),
            )),
        }
    }

    fn narrow(&self) -> Option<(&str, &dyn Resolver)> {
        Some((&self.type_name, self))
    }

    fn capabilities(&self) -> Vec<&str> {
        self.capabilities
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
