use async_recursion::async_recursion;
use indexmap::IndexMap;
use trellis::futures03::stream::{self, StreamExt};
use trellis::itertools::Itertools;
use trellis::prelude::*;

use crate::execution::ast as a;
use crate::execution::query::Query;
use crate::execution::resolver::{
    Arguments, BindError, FieldContext, NotImplemented, Resolved, Resolver,
};
use crate::schema::{FieldDescriptor, ObjectType, TypeDescriptor};
use crate::values::coercion;

/// Contextual information passed around during query execution.
#[derive(Clone)]
pub struct ExecutionContext {
    /// The logger to use.
    pub logger: Logger,

    /// The prepared query, carrying the schema and variable values.
    pub query: Arc<Query>,

    /// Observes cancellation of the request and its deadline.
    pub cancel: CancelHandle,

    /// How many sibling fields or list elements are evaluated at once.
    pub max_concurrency: usize,
}

/// A null that must propagate to the nearest nullable position.
#[derive(Debug)]
struct Nulled;

/// What evaluating one part of the result produced. Errors are carried
/// alongside the value so that sibling fields keep their results.
struct Outcome {
    value: Result<r::Value, Nulled>,
    errors: Vec<QueryError>,
}

impl Outcome {
    fn ok(value: r::Value) -> Self {
        Outcome {
            value: Ok(value),
            errors: vec![],
        }
    }

    /// A nullable position absorbs a propagated null.
    fn absorb(mut self) -> Self {
        if self.value.is_err() {
            self.value = Ok(r::Value::Null);
        }
        self
    }
}

/// Executes the root selection set of a query.
pub async fn execute_root_selection_set(
    ctx: &ExecutionContext,
    root: &dyn Resolver,
) -> QueryResult {
    let query_type = ctx.query.schema.query_type();
    let fields = ctx.query.selection_set.fields.iter().collect_vec();

    let outcome = execute_selection_set(ctx, fields, query_type, root, None, vec![]).await;
    let mut errors = outcome.errors;

    // Fields abandoned because of cancellation are summarized in one error
    if let Some(reason) = ctx.cancel.cancel_reason() {
        errors.retain(|e| {
            !matches!(
                e.execution_error(),
                Some(QueryExecutionError::Timeout) | Some(QueryExecutionError::Cancelled)
            )
        });
        errors.push(QueryExecutionError::from(reason).into());
    }

    let data = outcome.value.unwrap_or(r::Value::Null);
    QueryResult::new(Some(data)).with_errors(errors)
}

/// Executes a selection set against a value of the given object type.
///
/// `shared` is set when the value was narrowed from an abstract type; it
/// holds that type and the value before narrowing, which fields declared
/// on the abstract type bind against first.
#[async_recursion]
async fn execute_selection_set<'a>(
    ctx: &'a ExecutionContext,
    fields: Vec<&'a a::Field>,
    object_type: &'a ObjectType,
    value: &'a dyn Resolver,
    shared: Option<(&'a TypeDescriptor, &'a dyn Resolver)>,
    path: Vec<PathSegment>,
) -> Outcome {
    let grouped_field_set = collect_fields(ctx, object_type, fields);

    let mut field_futures: Vec<BoxFuture<'a, (&'a str, Outcome)>> = vec![];
    for (response_key, fields) in grouped_field_set {
        let mut path = path.clone();
        path.push(PathSegment::Field(response_key.to_string()));
        let future = async move {
            let outcome = if fields.is_empty() {
                // Only selected for other concrete types
                Outcome::ok(r::Value::Null)
            } else {
                execute_field(ctx, object_type, value, shared, fields, path).await
            };
            (response_key, outcome)
        };
        field_futures.push(future.boxed());
    }

    let outcomes: Vec<(&str, Outcome)> = stream::iter(field_futures)
        .buffered(ctx.max_concurrency)
        .collect()
        .await;

    let mut result_map = r::Object::new();
    let mut errors = vec![];
    let mut nulled = false;
    for (response_key, outcome) in outcomes {
        errors.extend(outcome.errors);
        match outcome.value {
            Ok(value) => {
                result_map.insert(response_key.to_string(), value);
            }
            Err(Nulled) => nulled = true,
        }
    }

    Outcome {
        value: if nulled {
            Err(Nulled)
        } else {
            Ok(r::Value::Object(result_map))
        },
        errors,
    }
}

/// Groups fields with the same response key, in order of first occurrence.
/// Fields whose type conditions do not hold for `object_type` are dropped,
/// but their response key is kept.
fn collect_fields<'a>(
    ctx: &ExecutionContext,
    object_type: &ObjectType,
    fields: Vec<&'a a::Field>,
) -> IndexMap<&'a str, Vec<&'a a::Field>> {
    let graph = ctx.query.schema.graph();
    let mut grouped_fields: IndexMap<&str, Vec<&a::Field>> = IndexMap::new();

    for field in fields {
        let group = grouped_fields.entry(field.response_key()).or_default();
        if field
            .type_conditions
            .iter()
            .all(|condition| graph.condition_applies(&object_type.name, condition))
        {
            group.push(field);
        }
    }

    grouped_fields
}

/// Executes a field.
async fn execute_field<'a>(
    ctx: &'a ExecutionContext,
    object_type: &'a ObjectType,
    value: &'a dyn Resolver,
    shared: Option<(&'a TypeDescriptor, &'a dyn Resolver)>,
    fields: Vec<&'a a::Field>,
    path: Vec<PathSegment>,
) -> Outcome {
    let field = fields[0];

    if field.is_typename() {
        return Outcome::ok(r::Value::String(object_type.name.clone()));
    }

    let field_definition = match object_type.fields.get(&field.name) {
        Some(field_definition) => field_definition,
        None => {
            let e = QueryExecutionError::UnknownField(
                field.position,
                object_type.name.clone(),
                field.name.clone(),
            );
            return field_failure(ctx, &TypeDescriptor::Named(String::new()), path, vec![e]);
        }
    };
    let field_type = &field_definition.field_type;

    // Abandon fields that have not started once the request is canceled
    if let Err(reason) = ctx.cancel.check_cancel() {
        return field_failure(ctx, field_type, path, vec![reason.into()]);
    }

    let arguments = match coerce_argument_values(ctx, field_definition, field) {
        Ok(arguments) => arguments,
        Err(errors) => return field_failure(ctx, field_type, path, errors),
    };

    let resolved = match resolve_field_value(
        ctx,
        object_type,
        value,
        shared,
        field,
        arguments,
        path.clone(),
    )
    .await
    {
        Ok(resolved) => resolved,
        Err(e) => return field_failure(ctx, field_type, path, vec![e]),
    };

    complete_value(ctx, field, field_type, &fields, resolved, path).await
}

/// Binds the field to a capability and invokes it.
async fn resolve_field_value<'a>(
    ctx: &'a ExecutionContext,
    object_type: &'a ObjectType,
    value: &'a dyn Resolver,
    shared: Option<(&'a TypeDescriptor, &'a dyn Resolver)>,
    field: &'a a::Field,
    arguments: Arguments,
    path: Vec<PathSegment>,
) -> Result<Resolved, QueryExecutionError> {
    let field_ctx = FieldContext {
        logger: ctx.logger.clone(),
        path,
        cancel: ctx.cancel.clone(),
    };

    // Fields of the abstract type are answered by the value before
    // narrowing when it can
    let bound = match shared {
        Some((abstract_type, original)) if abstract_type.field(&field.name).is_some() => {
            match original.resolve_field(&field.name, arguments.clone(), field_ctx.clone()) {
                Err(BindError::Missing) => value.resolve_field(&field.name, arguments, field_ctx),
                bound => bound,
            }
        }
        _ => value.resolve_field(&field.name, arguments, field_ctx),
    };

    let future = bound.map_err(|e| match e {
        BindError::Missing => QueryExecutionError::UnboundField(
            field.position,
            object_type.name.clone(),
            field.name.clone(),
        ),
        BindError::Ambiguous(names) => QueryExecutionError::AmbiguousBinding(
            field.position,
            object_type.name.clone(),
            field.name.clone(),
            names,
        ),
    })?;

    match future.cancelable(&ctx.cancel).await {
        Ok(Ok(resolved)) => Ok(resolved),
        Ok(Err(e)) => match e.downcast_ref::<NotImplemented>() {
            Some(NotImplemented(what)) => Err(QueryExecutionError::NotImplemented(
                field.position,
                what.clone(),
            )),
            None => Err(QueryExecutionError::ResolveError(
                field.position,
                field.name.clone(),
                format!("{:#}", e),
            )),
        },
        Err(reason) => Err(reason.into()),
    }
}

/// Records field errors and nulls the field.
fn field_failure(
    ctx: &ExecutionContext,
    field_type: &TypeDescriptor,
    path: Vec<PathSegment>,
    errors: Vec<QueryExecutionError>,
) -> Outcome {
    for e in &errors {
        debug!(
            ctx.logger,
            "Field failed";
            "path" => path.iter().join("."),
            "error" => e.to_string(),
            "code" => LogCode::FieldFailure,
        );
    }
    Outcome {
        value: match field_type {
            TypeDescriptor::NonNull(_) => Err(Nulled),
            _ => Ok(r::Value::Null),
        },
        errors: errors
            .into_iter()
            .map(|e| QueryError::FieldError(path.clone(), e))
            .collect(),
    }
}

/// Ensures that a value matches the expected return type.
#[async_recursion]
async fn complete_value<'a>(
    ctx: &'a ExecutionContext,
    field: &'a a::Field,
    field_type: &'a TypeDescriptor,
    fields: &'a [&'a a::Field],
    resolved: Resolved,
    path: Vec<PathSegment>,
) -> Outcome {
    match field_type {
        // Fail if the field type is non-null but the value is null
        TypeDescriptor::NonNull(inner_type) => {
            let mut outcome =
                complete_value(ctx, field, inner_type, fields, resolved, path.clone()).await;
            if let Ok(r::Value::Null) = outcome.value {
                // A null already explained by an error is not reported again
                if outcome.errors.is_empty() {
                    let e = QueryExecutionError::NonNullError(field.position, field.name.clone());
                    debug!(
                        ctx.logger,
                        "Field failed";
                        "path" => path.iter().join("."),
                        "error" => e.to_string(),
                        "code" => LogCode::FieldFailure,
                    );
                    outcome.errors.push(QueryError::FieldError(path, e));
                }
                outcome.value = Err(Nulled);
            }
            outcome
        }

        // If the resolved value is null, return null
        _ if resolved.is_null() => Outcome::ok(r::Value::Null),

        // Complete list values element by element
        TypeDescriptor::List(inner_type) => match resolved {
            Resolved::List(items) => {
                let mut item_futures: Vec<BoxFuture<'a, Outcome>> = vec![];
                for (index, item) in items.into_iter().enumerate() {
                    let mut path = path.clone();
                    path.push(PathSegment::Index(index));
                    item_futures.push(complete_value(ctx, field, inner_type, fields, item, path));
                }

                let outcomes: Vec<Outcome> = stream::iter(item_futures)
                    .buffered(ctx.max_concurrency)
                    .collect()
                    .await;

                let mut values = Vec::with_capacity(outcomes.len());
                let mut errors = vec![];
                let mut nulled = false;
                for outcome in outcomes {
                    errors.extend(outcome.errors);
                    match outcome.value {
                        Ok(value) => values.push(value),
                        Err(Nulled) => nulled = true,
                    }
                }
                Outcome {
                    value: if nulled {
                        Err(Nulled)
                    } else {
                        Ok(r::Value::List(values))
                    },
                    errors,
                }
                .absorb()
            }

            // Return field error if the resolved value for the list is not a list
            _ => field_failure(
                ctx,
                field_type,
                path,
                vec![QueryExecutionError::ListValueError(
                    field.position,
                    field.name.clone(),
                )],
            ),
        },

        // Resolve named types against the type graph
        TypeDescriptor::Named(name) => match ctx.query.schema.lookup(name) {
            Some(named_type) => {
                complete_named_value(ctx, field, named_type, fields, resolved, path)
                    .await
                    .absorb()
            }
            None => field_failure(
                ctx,
                field_type,
                path,
                vec![QueryExecutionError::NamedTypeError(name.clone())],
            ),
        },

        named_type => complete_named_value(ctx, field, named_type, fields, resolved, path)
            .await
            .absorb(),
    }
}

async fn complete_named_value<'a>(
    ctx: &'a ExecutionContext,
    field: &'a a::Field,
    named_type: &'a TypeDescriptor,
    fields: &'a [&'a a::Field],
    resolved: Resolved,
    path: Vec<PathSegment>,
) -> Outcome {
    let leaf_error = |reason: String| {
        QueryExecutionError::LeafValueError(
            field.position,
            field.name.clone(),
            named_type.name().to_string(),
            reason,
        )
    };

    match named_type {
        // Scalar values are passed through unchanged
        TypeDescriptor::Scalar(_) => match resolved {
            Resolved::Leaf(value) => Outcome::ok(value),
            _ => field_failure(
                ctx,
                named_type,
                path,
                vec![leaf_error("expected a scalar value".to_string())],
            ),
        },

        // Enum values must be members of the enum
        TypeDescriptor::Enum(t) => match resolved {
            Resolved::Leaf(r::Value::Enum(name)) | Resolved::Leaf(r::Value::String(name))
                if t.values.contains(&name) =>
            {
                Outcome::ok(r::Value::Enum(name))
            }
            Resolved::Leaf(value) => field_failure(
                ctx,
                named_type,
                path,
                vec![leaf_error(format!("`{}` is not a member of the enum", value))],
            ),
            _ => field_failure(
                ctx,
                named_type,
                path,
                vec![leaf_error("expected an enum value".to_string())],
            ),
        },

        // Complete object types recursively
        TypeDescriptor::Object(object_type) => match resolved {
            Resolved::Object(resolver) => {
                let fields = merge_selection_sets(fields);
                // Sum types standing in for this object type are unwrapped
                let value = match resolver.narrow() {
                    Some((tag, concrete)) if tag == object_type.name => concrete,
                    _ => resolver.as_ref(),
                };
                execute_selection_set(ctx, fields, object_type, value, None, path).await
            }
            _ => field_failure(
                ctx,
                named_type,
                path,
                vec![QueryExecutionError::ObjectValueError(
                    field.position,
                    field.name.clone(),
                    object_type.name.clone(),
                )],
            ),
        },

        // Narrow interface and union values to a concrete object type and
        // complete the value recursively
        TypeDescriptor::Interface(_) | TypeDescriptor::Union(_) => match resolved {
            Resolved::Object(resolver) => {
                let (object_type, concrete) =
                    match resolve_abstract_type(ctx, named_type, resolver.as_ref()) {
                        Ok(narrowed) => narrowed,
                        Err(e) => return field_failure(ctx, named_type, path, vec![e]),
                    };
                let fields = merge_selection_sets(fields);
                execute_selection_set(
                    ctx,
                    fields,
                    object_type,
                    concrete,
                    Some((named_type, resolver.as_ref())),
                    path,
                )
                .await
            }
            _ => field_failure(
                ctx,
                named_type,
                path,
                vec![QueryExecutionError::ObjectValueError(
                    field.position,
                    field.name.clone(),
                    named_type.name().to_string(),
                )],
            ),
        },

        _ => field_failure(
            ctx,
            named_type,
            path,
            vec![QueryExecutionError::NamedTypeError(
                named_type.name().to_string(),
            )],
        ),
    }
}

/// Resolves an abstract type (interface, union) into an object type based
/// on the variant the value narrows to. Possible types are tried in
/// declaration order.
fn resolve_abstract_type<'a>(
    ctx: &'a ExecutionContext,
    abstract_type: &TypeDescriptor,
    value: &'a dyn Resolver,
) -> Result<(&'a ObjectType, &'a dyn Resolver), QueryExecutionError> {
    let graph = ctx.query.schema.graph();
    let abstract_name = abstract_type.name();

    let (tag, concrete) = value.narrow().ok_or_else(|| {
        QueryExecutionError::AbstractTypeError(
            abstract_name.to_string(),
            format!("`{}` value has no concrete type", value.type_name()),
        )
    })?;

    graph
        .possible_types(abstract_name)
        .into_iter()
        .find(|possible_type| *possible_type == tag)
        .and_then(|possible_type| match graph.lookup(possible_type) {
            Some(TypeDescriptor::Object(object_type)) => Some((object_type, concrete)),
            _ => None,
        })
        .ok_or_else(|| {
            QueryExecutionError::AbstractTypeError(
                abstract_name.to_string(),
                format!("`{}` is not a possible type", tag),
            )
        })
}

/// Merges the selection sets of several fields into a single list of fields.
fn merge_selection_sets<'a>(fields: &[&'a a::Field]) -> Vec<&'a a::Field> {
    fields
        .iter()
        .flat_map(|field| field.selection_set.fields.iter())
        .collect()
}

/// Coerces argument values into the arguments handed to capabilities.
pub fn coerce_argument_values(
    ctx: &ExecutionContext,
    field_definition: &FieldDescriptor,
    field: &a::Field,
) -> Result<Arguments, Vec<QueryExecutionError>> {
    let mut coerced_values = r::Object::new();
    let mut errors = vec![];

    for argument_def in &field_definition.arguments {
        let value = field.argument_value(&argument_def.name).cloned();
        match coercion::coerce_input_value(
            field.position,
            value,
            argument_def,
            ctx.query.schema.graph(),
            &ctx.query.variables,
        ) {
            Ok(Some(value)) => {
                coerced_values.insert(argument_def.name.clone(), value);
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(Arguments::new(coerced_values))
    } else {
        Err(errors)
    }
}
