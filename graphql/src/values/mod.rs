/// Utilities for coercing GraphQL values based on GraphQL types.
pub mod coercion;

pub use self::coercion::MaybeCoercible;
