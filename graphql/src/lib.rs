pub use trellis::graphql_parser;

/// Utilities for working with GraphQL schemas.
pub mod schema;

/// Utilities for executing GraphQL.
pub mod execution;

/// Utilities for executing GraphQL queries and working with query ASTs.
pub mod query;

/// Utilities for working with GraphQL values.
mod values;

/// The external interface for actually running queries
mod runner;

/// Prelude that exports the most important traits and types.
pub mod prelude {
    pub use super::execution::{
        Arguments, BindError, Bindings, DynamicObject, ExecutionContext, FieldContext,
        FieldFuture, FromArguments, NotImplemented, Object, Resolved, Resolver,
    };
    pub use super::query::{execute_query, QueryExecutionOptions};
    pub use super::schema::{ConstructionError, Schema, TypeDescriptor, TypeGraph};
    pub use super::values::MaybeCoercible;

    pub use super::runner::GraphQlRunner;
}
