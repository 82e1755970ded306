use super::error::{QueryError, QueryExecutionError};
use crate::data::value::Value;
use serde_derive::Serialize;

fn errors_is_empty(errors: &[QueryError]) -> bool {
    errors.is_empty()
}

/// The result of running a query.
///
/// `data` is `None` only when the request failed before execution started;
/// a request whose root was nulled by a non-null violation carries
/// `Some(Value::Null)`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "errors_is_empty")]
    pub errors: Vec<QueryError>,
}

impl QueryResult {
    pub fn new(data: Option<Value>) -> Self {
        QueryResult {
            data,
            errors: vec![],
        }
    }

    pub fn with_errors(mut self, errors: Vec<QueryError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The compact JSON wire form of the result.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<QueryExecutionError> for QueryResult {
    fn from(e: QueryExecutionError) -> Self {
        QueryResult::from(QueryError::from(e))
    }
}

impl From<QueryError> for QueryResult {
    fn from(e: QueryError) -> Self {
        QueryResult {
            data: None,
            errors: vec![e],
        }
    }
}

impl From<Vec<QueryExecutionError>> for QueryResult {
    fn from(e: Vec<QueryExecutionError>) -> Self {
        QueryResult {
            data: None,
            errors: e.into_iter().map(QueryError::from).collect(),
        }
    }
}

impl<V: Into<QueryResult>, E: Into<QueryResult>> From<Result<V, E>> for QueryResult {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(v) => v.into(),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object;

    #[test]
    fn data_and_errors_are_omitted_when_absent() {
        let result = QueryResult::new(Some(object! { hello: "Hello world!" }));
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"data":{"hello":"Hello world!"}}"#
        );

        let result = QueryResult::from(QueryExecutionError::EmptyQuery);
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"errors":[{"message":"The query is empty"}]}"#
        );
    }

    #[test]
    fn nulled_root_serializes_explicitly() {
        let result = QueryResult::new(Some(Value::Null))
            .with_errors(vec![QueryExecutionError::Timeout.into()]);
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"data":null,"errors":[{"message":"Query timed out"}]}"#
        );
    }
}
