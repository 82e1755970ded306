use graphql_parser::query as q;
use serde::de::Deserializer;
use serde_derive::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::error::QueryError;
use crate::data::value::Value;

fn deserialize_variables<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let pairs: BTreeMap<String, serde_json::Value> = serde::Deserialize::deserialize(deserializer)?;
    Ok(pairs.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

/// Variable values for a GraphQL query, as sent by the client. They are
/// coerced against the variable definitions of the operation when the
/// query is executed.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct QueryVariables(
    #[serde(deserialize_with = "deserialize_variables")] HashMap<String, Value>,
);

impl QueryVariables {
    pub fn new(variables: HashMap<String, Value>) -> Self {
        QueryVariables(variables)
    }
}

impl Deref for QueryVariables {
    type Target = HashMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for QueryVariables {
    fn deref_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.0
    }
}

impl serde::ser::Serialize for QueryVariables {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A GraphQL query as submitted by a client.
#[derive(Clone, Debug)]
pub struct Query {
    pub document: q::Document<'static, String>,
    pub variables: Option<QueryVariables>,
    pub operation_name: Option<String>,
    pub query_text: Arc<String>,
}

impl Query {
    pub fn new(
        document: q::Document<'static, String>,
        variables: Option<QueryVariables>,
    ) -> Self {
        let query_text = Arc::new(document.to_string());
        Query {
            document,
            variables,
            operation_name: None,
            query_text,
        }
    }

    /// Parses request text into a query.
    pub fn parse(text: &str, variables: Option<QueryVariables>) -> Result<Self, QueryError> {
        let document = q::parse_query::<String>(text)?.into_static();
        Ok(Query {
            document,
            variables,
            operation_name: None,
            query_text: Arc::new(text.to_string()),
        })
    }

    /// Selects the operation to run when the document contains several.
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}
