/// The selection tree the engine walks.
pub mod ast;

/// Implementation of the GraphQL execution algorithm.
mod execution;

/// Common trait for field resolvers used in the execution.
mod resolver;

mod query;

pub use self::execution::*;
pub use self::query::{coerce_variables, Query};
pub use self::resolver::{
    verify_bindings, Arguments, BindError, Bindings, DynamicObject, FieldContext, FieldFuture,
    FromArguments, NotImplemented, Object, Resolved, Resolver,
};
