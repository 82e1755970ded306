/// Common data types used throughout Trellis.
pub mod data;

/// Process configuration read from the environment.
pub mod env;

/// Extension traits for external types.
pub mod ext;

/// Logging utilities.
pub mod log;

pub use futures03;
pub use graphql_parser;
pub use itertools;
pub use lazy_static;
pub use serde_json;
pub use slog;
pub use tokio;

/// A prelude that makes the shared traits and data types available.
///
/// Add the following code to import all traits and data types listed below at once.
///
/// ```
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use ::anyhow::{self, anyhow, bail, Context as _};
    pub use futures03;
    pub use futures03::future::{BoxFuture, FutureExt};
    pub use serde_derive::{Deserialize, Serialize};
    pub use serde_json;
    pub use slog::{self, crit, debug, error, info, o, trace, warn, Logger};
    pub use std::fmt::Debug;
    pub use std::sync::Arc;
    pub use tokio;

    pub use crate::data::graphql::{TryFromValue, ValueMap};
    pub use crate::data::query::{
        PathSegment, Query, QueryError, QueryExecutionError, QueryResult, QueryVariables,
    };
    pub use crate::data::value::IntoValue;
    pub use crate::env::ENV_VARS;
    pub use crate::ext::futures::{
        CancelGuard, CancelHandle, CancelReason, CancelToken, FutureExtension,
    };
    pub use crate::log::LogCode;
    pub use crate::object;
    pub use graphql_parser::Pos;

    macro_rules! static_graphql {
        ($m:ident, $m2:ident, {$($n:ident,)*}) => {
            pub mod $m {
                use graphql_parser::$m2 as $m;
                pub use $m::*;
                $(
                    pub type $n = $m::$n<'static, String>;
                )*
            }
        };
    }

    // The engine only works with owned documents.
    static_graphql!(q, query, {
        Document, Value, OperationDefinition, InlineFragment, TypeCondition,
        FragmentSpread, Field, Selection, SelectionSet, FragmentDefinition,
        Directive, VariableDefinition, Type, Query, Definition,
    });
    static_graphql!(s, schema, {
        Field, Directive, InterfaceType, ObjectType, Value, TypeDefinition,
        EnumType, Type, Document, ScalarType, InputValue, UnionType,
        InputObjectType, EnumValue, Definition, SchemaDefinition,
    });

    /// Result values.
    pub mod r {
        pub use crate::data::value::{Object, Value};
    }
}
