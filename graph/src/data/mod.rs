/// Data types for dealing with GraphQL queries.
pub mod query;

/// Data types for dealing with GraphQL values.
pub mod graphql;

/// The value model shared by results and coerced inputs.
pub mod value;
