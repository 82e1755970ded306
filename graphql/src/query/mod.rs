use trellis::tokio::time::Instant;
use trellis::prelude::*;

use crate::execution::{execute_root_selection_set, ExecutionContext, Query, Resolver};

/// Utilities for working with GraphQL query ASTs.
pub mod ast;

/// Options available for query execution.
#[derive(Clone)]
pub struct QueryExecutionOptions {
    /// The logger to use during query execution.
    pub logger: Logger,

    /// Time at which the query times out.
    pub deadline: Option<Instant>,

    /// Maximum depth for a query.
    pub max_depth: u8,

    /// Maximum number of sibling fields or list elements evaluated at once.
    pub max_concurrency: usize,
}

impl QueryExecutionOptions {
    /// Options with the limits configured in the environment.
    pub fn new(logger: Logger) -> Self {
        QueryExecutionOptions {
            logger,
            deadline: ENV_VARS
                .graphql_query_timeout()
                .map(|timeout| Instant::now() + timeout),
            max_depth: ENV_VARS.graphql_max_depth(),
            max_concurrency: ENV_VARS.graphql_field_concurrency(),
        }
    }
}

/// Executes a prepared query against `root` and returns the result. The
/// deadline in `options` is added to `cancel`.
pub async fn execute_query(
    query: Arc<Query>,
    root: &dyn Resolver,
    options: QueryExecutionOptions,
    cancel: CancelHandle,
) -> QueryResult {
    let cancel = match options.deadline {
        Some(deadline) => cancel.with_deadline(deadline),
        None => cancel,
    };

    let ctx = ExecutionContext {
        logger: query.logger.clone(),
        query: query.clone(),
        cancel,
        max_concurrency: options.max_concurrency.max(1),
    };

    let result = execute_root_selection_set(&ctx, root).await;
    query.log_execution(result.errors.len());
    result
}
