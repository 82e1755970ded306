use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use trellis::data::query::{Query as GraphDataQuery, QueryVariables};
use trellis::prelude::*;

use crate::execution::ast as a;
use crate::query::ast as qast;
use crate::schema::ast as sast;
use crate::schema::{Schema, TypeDescriptor};
use crate::values::coercion;

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Helper to log the fields in a `SelectionSet` without cloning. Writes
/// a list of response keys separated by ';', since slog uses ',' to
/// separate key/value pairs.
pub(crate) struct SelectedFields<'a>(pub &'a a::SelectionSet);

impl<'a> std::fmt::Display for SelectedFields<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        if self.0.is_empty() {
            return write!(fmt, "-");
        }
        for (i, field) in self.0.fields.iter().enumerate() {
            if i > 0 {
                write!(fmt, ";")?;
            }
            write!(fmt, "{}", field.response_key())?;
        }
        Ok(())
    }
}

/// A GraphQL query that has been preprocessed and checked and is ready
/// for execution. Checking validates every selected field, argument and
/// type condition against the schema and enforces the maximum depth.
pub struct Query {
    /// The schema against which to execute the query
    pub schema: Arc<Schema>,
    /// The root selection set of the query, with fragments flattened
    pub selection_set: Arc<a::SelectionSet>,
    /// The coerced variable values
    pub variables: Arc<HashMap<String, r::Value>>,

    pub logger: Logger,

    start: Instant,

    /// Used only for logging
    pub query_text: Arc<String>,
    pub variables_text: Arc<String>,
    pub query_id: u64,
}

impl Query {
    /// Process the raw GraphQL query `query` and prepare for executing it.
    /// If any part of the request does not fit the schema, all problems
    /// found are returned and nothing may be executed.
    pub fn new(
        logger: &Logger,
        schema: Arc<Schema>,
        query: GraphDataQuery,
        max_depth: u8,
    ) -> Result<Arc<Self>, Vec<QueryExecutionError>> {
        let operation = qast::get_operation(&query.document, query.operation_name.as_deref())?;

        let selection_set = match operation {
            q::OperationDefinition::Query(q::Query { selection_set, .. })
            // Queries can be run by just sending a selection set
            | q::OperationDefinition::SelectionSet(selection_set) => selection_set,
            q::OperationDefinition::Mutation(_) => {
                return Err(vec![QueryExecutionError::NotSupported(
                    "Mutations are not supported".to_owned(),
                )])
            }
            q::OperationDefinition::Subscription(_) => {
                return Err(vec![QueryExecutionError::NotSupported(
                    "Subscriptions are not supported".to_owned(),
                )])
            }
        };

        let variables = coerce_variables(schema.as_ref(), operation, query.variables.as_ref())?;

        let selection_set = SelectionBuilder {
            document: &query.document,
            variables: &variables,
        }
        .build(selection_set, &[], &mut vec![])
        .map_err(|e| vec![e])?;

        validate_fields(&schema, &selection_set, max_depth)?;

        let query_id = NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed);
        let variables_text = query
            .variables
            .as_ref()
            .and_then(|vars| serde_json::to_string(vars).ok())
            .unwrap_or_default();
        let logger = logger.new(o!(
            "schema" => schema.id.clone(),
            "query_id" => query_id,
        ));

        Ok(Arc::new(Self {
            schema,
            selection_set: Arc::new(selection_set),
            variables: Arc::new(variables),
            logger,
            start: Instant::now(),
            query_text: query.query_text.clone(),
            variables_text: Arc::new(variables_text),
            query_id,
        }))
    }

    /// Log details about the overall execution of the query
    pub fn log_execution(&self, errors: usize) {
        if ENV_VARS.log_query_timing() {
            let code = if errors == 0 {
                LogCode::GraphQlQuerySuccess
            } else {
                LogCode::GraphQlQueryFailure
            };
            info!(
                &self.logger,
                "Query timing (GraphQL)";
                "query" => self.query_text.as_str(),
                "variables" => self.variables_text.as_str(),
                "query_time_ms" => self.start.elapsed().as_millis(),
                "selection" => %SelectedFields(&self.selection_set),
                "errors" => errors,
                "code" => code,
            );
        }
    }
}

/// Coerces variable values for an operation.
pub fn coerce_variables(
    schema: &Schema,
    operation: &q::OperationDefinition,
    variables: Option<&QueryVariables>,
) -> Result<HashMap<String, r::Value>, Vec<QueryExecutionError>> {
    let mut coerced_values = HashMap::new();
    let mut errors = vec![];
    let no_variables = HashMap::new();

    for variable_def in qast::get_variable_definitions(operation)
        .into_iter()
        .flatten()
    {
        let var_type = sast::from_ast_type(&variable_def.var_type);

        // Skip variable if it has an invalid type
        if !schema
            .lookup(var_type.name())
            .map_or(false, TypeDescriptor::is_input)
        {
            errors.push(QueryExecutionError::InvalidVariableTypeError(
                variable_def.position,
                variable_def.name.to_owned(),
            ));
            continue;
        }

        let (value, shown) = match variables.and_then(|vars| vars.get(&variable_def.name)) {
            Some(value) => (
                coercion::variable_literal(value.clone(), &var_type, schema.graph()),
                value.to_string(),
            ),
            None => match &variable_def.default_value {
                Some(value) => (value.clone(), format!("{:?}", value)),
                // No variable value provided and no default for non-null type, fail
                None => {
                    if sast::is_non_null_type(&var_type) {
                        errors.push(QueryExecutionError::MissingVariableError(
                            variable_def.position,
                            variable_def.name.to_owned(),
                        ));
                    }
                    continue;
                }
            },
        };

        // We have a variable value, attempt to coerce it to the value type
        // of the variable definition
        match coercion::coerce_value(&value, &var_type, schema.graph(), &no_variables) {
            Some(coerced) => {
                coerced_values.insert(variable_def.name.to_owned(), coerced);
            }
            None => errors.push(QueryExecutionError::InvalidVariableError(
                variable_def.position,
                variable_def.name.to_owned(),
                shown,
            )),
        }
    }

    if errors.is_empty() {
        Ok(coerced_values)
    } else {
        Err(errors)
    }
}

/// Turns the selection sets of the request document into the selection
/// tree the engine walks.
struct SelectionBuilder<'a> {
    document: &'a q::Document,
    variables: &'a HashMap<String, r::Value>,
}

impl<'a> SelectionBuilder<'a> {
    fn build(
        &self,
        selection_set: &'a q::SelectionSet,
        type_conditions: &[String],
        spreads: &mut Vec<&'a str>,
    ) -> Result<a::SelectionSet, QueryExecutionError> {
        let mut fields = vec![];

        for selection in selection_set
            .items
            .iter()
            .filter(|selection| !qast::skip_selection(selection, self.variables))
            .filter(|selection| qast::include_selection(selection, self.variables))
        {
            match selection {
                q::Selection::Field(field) => fields.push(a::Field {
                    position: field.position,
                    alias: field.alias.clone(),
                    name: field.name.clone(),
                    arguments: field.arguments.clone(),
                    // Type conditions only apply at the level they were written at
                    selection_set: self.build(&field.selection_set, &[], spreads)?,
                    type_conditions: type_conditions.to_vec(),
                }),
                q::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment = qast::get_fragment(self.document, name)
                        .ok_or_else(|| QueryExecutionError::UndefinedFragment(name.to_string()))?;
                    if spreads.contains(&name) {
                        return Err(QueryExecutionError::CyclicalFragment(name.to_string()));
                    }

                    let q::TypeCondition::On(condition) = &fragment.type_condition;
                    let mut conditions = type_conditions.to_vec();
                    conditions.push(condition.clone());

                    spreads.push(name);
                    let inner = self.build(&fragment.selection_set, &conditions, spreads);
                    spreads.pop();
                    fields.extend(inner?.fields);
                }
                q::Selection::InlineFragment(fragment) => {
                    let mut conditions = type_conditions.to_vec();
                    if let Some(q::TypeCondition::On(condition)) = &fragment.type_condition {
                        conditions.push(condition.clone());
                    }
                    let inner = self.build(&fragment.selection_set, &conditions, spreads)?;
                    fields.extend(inner.fields);
                }
            }
        }

        Ok(a::SelectionSet { fields })
    }
}

/// Checks the selection tree against the schema. Any problem found makes
/// the whole request invalid.
fn validate_fields(
    schema: &Schema,
    selection_set: &a::SelectionSet,
    max_depth: u8,
) -> Result<(), Vec<QueryExecutionError>> {
    let mut errors = vec![];
    validate_fields_inner(
        schema,
        &schema.query_type().name,
        selection_set,
        max_depth,
        1,
        &mut errors,
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_fields_inner(
    schema: &Schema,
    type_name: &str,
    selection_set: &a::SelectionSet,
    max_depth: u8,
    depth: u8,
    errors: &mut Vec<QueryExecutionError>,
) {
    if depth > max_depth {
        if !errors
            .iter()
            .any(|e| matches!(e, QueryExecutionError::TooDeep(_)))
        {
            errors.push(QueryExecutionError::TooDeep(max_depth));
        }
        return;
    }

    let graph = schema.graph();

    for field in &selection_set.fields {
        // Every type condition must name a composite type that can overlap
        // with the type the selection is made on
        let mut parent = type_name;
        let mut conditions_ok = true;
        for condition in &field.type_conditions {
            match graph.lookup(condition) {
                Some(t) if t.is_composite() => {
                    if !graph.types_overlap(parent, condition) {
                        errors.push(QueryExecutionError::InvalidTypeCondition(
                            field.position,
                            condition.clone(),
                            parent.to_string(),
                        ));
                        conditions_ok = false;
                    }
                }
                _ => {
                    errors.push(QueryExecutionError::UnknownType(
                        field.position,
                        condition.clone(),
                    ));
                    conditions_ok = false;
                }
            }
            parent = condition;
        }
        if !conditions_ok {
            continue;
        }

        let lookup_type = field.lookup_type(type_name);

        if field.is_typename() {
            if !field.selection_set.is_empty() {
                errors.push(QueryExecutionError::UnexpectedSubselection(
                    field.position,
                    field.name.clone(),
                    "String".to_string(),
                ));
            }
            continue;
        }

        let field_def = match graph.lookup(lookup_type).and_then(|t| t.field(&field.name)) {
            Some(field_def) => field_def,
            None => {
                errors.push(QueryExecutionError::UnknownField(
                    field.position,
                    lookup_type.to_string(),
                    field.name.clone(),
                ));
                continue;
            }
        };

        for (name, _) in &field.arguments {
            if field_def.argument(name).is_none() {
                errors.push(QueryExecutionError::UnknownArgument(
                    field.position,
                    field.name.clone(),
                    name.clone(),
                ));
            }
        }

        let base_type = field_def.field_type.name();
        let named_type = match graph.lookup(base_type) {
            Some(t) => t,
            None => {
                errors.push(QueryExecutionError::NamedTypeError(base_type.to_string()));
                continue;
            }
        };

        match (named_type.is_composite(), field.selection_set.is_empty()) {
            (true, true) => errors.push(QueryExecutionError::MissingSubselection(
                field.position,
                field.name.clone(),
                field_def.field_type.to_string(),
            )),
            (false, false) => errors.push(QueryExecutionError::UnexpectedSubselection(
                field.position,
                field.name.clone(),
                field_def.field_type.to_string(),
            )),
            (true, false) => validate_fields_inner(
                schema,
                base_type,
                &field.selection_set,
                max_depth,
                depth + 1,
                errors,
            ),
            (false, true) => {}
        }
    }
}
