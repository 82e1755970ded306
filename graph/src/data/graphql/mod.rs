/// Utilities for working with GraphQL values.
mod values;

pub use self::values::{
    // Trait for converting from GraphQL values into other types.
    TryFromValue,

    // Trait for plucking typed values out of a GraphQL value maps.
    ValueMap,
};
