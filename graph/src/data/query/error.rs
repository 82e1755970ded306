use graphql_parser::{query as q, Pos};
use serde::ser::*;
use serde_derive::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::ext::futures::CancelReason;

/// One step of the path from the root of the result to a field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl Serialize for PathSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PathSegment::Field(name) => serializer.serialize_str(name),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// Error caused while executing a [Query](struct.Query.html).
#[derive(Clone, Debug, Error)]
pub enum QueryExecutionError {
    #[error("Operation name required")]
    OperationNameRequired,
    #[error("Operation name not found `{0}`")]
    OperationNotFound(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("No root Query type defined in the schema")]
    NoRootQueryObjectType,
    #[error("The query is empty")]
    EmptyQuery,
    #[error("Type `{1}` has no field `{2}`")]
    UnknownField(Pos, String, String),
    #[error("Field `{1}` has no argument `{2}`")]
    UnknownArgument(Pos, String, String),
    #[error("Unknown type `{1}`")]
    UnknownType(Pos, String),
    #[error("Fragment on `{1}` can never apply to values of type `{2}`")]
    InvalidTypeCondition(Pos, String, String),
    #[error("Field `{1}` of type `{2}` must not have a selection since it has no subfields")]
    UnexpectedSubselection(Pos, String, String),
    #[error("Field `{1}` of type `{2}` must have a selection of subfields")]
    MissingSubselection(Pos, String, String),
    #[error("The query exceeds the maximum depth of {0}")]
    TooDeep(u8),
    #[error("Undefined fragment `{0}`")]
    UndefinedFragment(String),
    #[error("Fragment `{0}` spreads itself")]
    CyclicalFragment(String),
    #[error("Variable `{1}` must be an input type")]
    InvalidVariableTypeError(Pos, String),
    #[error("No value provided for required variable `{1}`")]
    MissingVariableError(Pos, String),
    #[error("Invalid value provided for variable `{1}`: {2}")]
    InvalidVariableError(Pos, String, String),
    #[error("Type `{1}` has no capability bound to field `{2}`")]
    UnboundField(Pos, String, String),
    #[error(
        "Field `{2}` of type `{1}` matches more than one capability: {names}",
        names = .3.join(", ")
    )]
    AmbiguousBinding(Pos, String, String, Vec<String>),
    #[error("Invalid value provided for argument `{1}`: {2:?}")]
    InvalidArgumentError(Pos, String, q::Value<'static, String>),
    #[error("No value provided for required argument `{1}`")]
    MissingArgumentError(Pos, String),
    #[error("Failed to resolve `{1}`: {2}")]
    ResolveError(Pos, String, String),
    #[error("Not implemented: {1}")]
    NotImplemented(Pos, String),
    #[error("Failed to resolve abstract type `{0}`: {1}")]
    AbstractTypeError(String, String),
    #[error("Null value resolved for non-null field `{1}`")]
    NonNullError(Pos, String),
    #[error("Non-list value resolved for list field `{1}`")]
    ListValueError(Pos, String),
    #[error("Non-object value resolved for field `{1}` of type `{2}`")]
    ObjectValueError(Pos, String, String),
    #[error("Invalid value resolved for field `{1}` of type `{2}`: {3}")]
    LeafValueError(Pos, String, String, String),
    #[error("Failed to resolve named type `{0}`")]
    NamedTypeError(String),
    #[error("Query timed out")]
    Timeout,
    #[error("Query was cancelled")]
    Cancelled,
}

impl QueryExecutionError {
    /// The location in the query text the error refers to, if any.
    pub fn position(&self) -> Option<Pos> {
        use QueryExecutionError::*;
        match self {
            UnknownField(pos, _, _)
            | UnknownArgument(pos, _, _)
            | UnknownType(pos, _)
            | InvalidTypeCondition(pos, _, _)
            | UnexpectedSubselection(pos, _, _)
            | MissingSubselection(pos, _, _)
            | InvalidVariableTypeError(pos, _)
            | MissingVariableError(pos, _)
            | InvalidVariableError(pos, _, _)
            | UnboundField(pos, _, _)
            | AmbiguousBinding(pos, _, _, _)
            | InvalidArgumentError(pos, _, _)
            | MissingArgumentError(pos, _)
            | ResolveError(pos, _, _)
            | NotImplemented(pos, _)
            | NonNullError(pos, _)
            | ListValueError(pos, _)
            | ObjectValueError(pos, _, _)
            | LeafValueError(pos, _, _, _) => Some(*pos),
            OperationNameRequired
            | OperationNotFound(_)
            | NotSupported(_)
            | NoRootQueryObjectType
            | EmptyQuery
            | TooDeep(_)
            | UndefinedFragment(_)
            | CyclicalFragment(_)
            | AbstractTypeError(_, _)
            | NamedTypeError(_)
            | Timeout
            | Cancelled => None,
        }
    }

    /// Whether the error only nulls the field it occurred at. All other
    /// errors mean the request is not well-formed against the schema and
    /// abort it before any data is produced.
    pub fn is_field_scoped(&self) -> bool {
        use QueryExecutionError::*;
        match self {
            UnboundField(..)
            | AmbiguousBinding(..)
            | InvalidArgumentError(..)
            | MissingArgumentError(..)
            | ResolveError(..)
            | NotImplemented(..)
            | AbstractTypeError(..)
            | NonNullError(..)
            | ListValueError(..)
            | ObjectValueError(..)
            | LeafValueError(..)
            | NamedTypeError(..)
            | Timeout
            | Cancelled => true,
            OperationNameRequired
            | OperationNotFound(_)
            | NotSupported(_)
            | NoRootQueryObjectType
            | EmptyQuery
            | UnknownField(..)
            | UnknownArgument(..)
            | UnknownType(..)
            | InvalidTypeCondition(..)
            | UnexpectedSubselection(..)
            | MissingSubselection(..)
            | TooDeep(_)
            | UndefinedFragment(_)
            | CyclicalFragment(_)
            | InvalidVariableTypeError(..)
            | MissingVariableError(..)
            | InvalidVariableError(..) => false,
        }
    }
}

impl From<CancelReason> for QueryExecutionError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Canceled => QueryExecutionError::Cancelled,
            CancelReason::DeadlineExceeded => QueryExecutionError::Timeout,
        }
    }
}

impl From<QueryExecutionError> for Vec<QueryExecutionError> {
    fn from(e: QueryExecutionError) -> Self {
        vec![e]
    }
}

/// Error caused while processing a [Query](struct.Query.html) request.
#[derive(Clone, Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    ParseError(Arc<anyhow::Error>),
    #[error("{0}")]
    ExecutionError(QueryExecutionError),
    /// An execution error attributed to the field at the given path.
    #[error("{1}")]
    FieldError(Vec<PathSegment>, QueryExecutionError),
}

impl QueryError {
    pub fn path(&self) -> Option<&[PathSegment]> {
        match self {
            QueryError::FieldError(path, _) => Some(path.as_slice()),
            _ => None,
        }
    }

    pub fn execution_error(&self) -> Option<&QueryExecutionError> {
        match self {
            QueryError::ExecutionError(e) | QueryError::FieldError(_, e) => Some(e),
            QueryError::ParseError(_) => None,
        }
    }
}

impl From<QueryExecutionError> for QueryError {
    fn from(e: QueryExecutionError) -> Self {
        QueryError::ExecutionError(e)
    }
}

impl From<q::ParseError> for QueryError {
    fn from(e: q::ParseError) -> Self {
        QueryError::ParseError(Arc::new(e.into()))
    }
}

#[derive(Serialize)]
struct Location {
    line: usize,
    column: usize,
}

impl Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.to_string())?;

        if let Some(pos) = self.execution_error().and_then(|e| e.position()) {
            let location = Location {
                line: pos.line,
                column: pos.column,
            };
            map.serialize_entry("locations", &[location])?;
        }

        if let Some(path) = self.path() {
            map.serialize_entry("path", path)?;
        }

        map.end()
    }
}
