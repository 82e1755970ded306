use std::time::Instant;
use trellis::data::query::Query;
use trellis::prelude::*;

use crate::execution::{verify_bindings, Object, Resolver};
use crate::query::{execute_query, QueryExecutionOptions};
use crate::schema::{ConstructionError, Schema};

/// Runs requests against one schema and one root resolver.
pub struct GraphQlRunner {
    logger: Logger,
    schema: Arc<Schema>,
    root: Arc<dyn Resolver>,
}

impl GraphQlRunner {
    /// Creates a new query runner.
    pub fn new(logger: &Logger, schema: Arc<Schema>, root: Arc<dyn Resolver>) -> Self {
        let logger = logger.new(o!("component" => "GraphQlRunner"));
        GraphQlRunner {
            logger,
            schema,
            root,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Checks the bindings of a statically known resolver type against the
    /// schema. Whether a field without a capability is an error depends on
    /// `TRELLIS_STRICT_BINDINGS`.
    pub fn verify<T: Object>(&self) -> Result<(), ConstructionError> {
        verify_bindings(
            &self.logger,
            &self.schema,
            T::bindings(),
            ENV_VARS.strict_bindings(),
        )
    }

    /// Runs a query with the limits configured in the environment.
    pub async fn run_query(&self, query: Query) -> QueryResult {
        let options = QueryExecutionOptions::new(self.logger.clone());
        self.run_query_with_options(query, options, CancelHandle::never())
            .await
    }

    /// Runs a query. Canceling `cancel` abandons the fields that have not
    /// been evaluated yet; the result then holds what was completed.
    pub async fn run_query_with_options(
        &self,
        query: Query,
        options: QueryExecutionOptions,
        cancel: CancelHandle,
    ) -> QueryResult {
        let start = Instant::now();
        let query = match crate::execution::Query::new(
            &options.logger,
            self.schema.clone(),
            query,
            options.max_depth,
        ) {
            Ok(query) => query,
            Err(errors) => {
                debug!(
                    self.logger,
                    "Query rejected";
                    "errors" => errors.len(),
                    "query_time_ms" => start.elapsed().as_millis(),
                    "code" => LogCode::GraphQlQueryFailure,
                );
                return QueryResult::from(errors);
            }
        };

        execute_query(query, self.root.as_ref(), options, cancel).await
    }
}
