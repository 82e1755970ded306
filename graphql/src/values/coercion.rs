use std::collections::HashMap;
use trellis::prelude::*;

use crate::schema::ast::{self as sast, ArgumentDescriptor, EnumType, ScalarType, TypeDescriptor};
use crate::schema::TypeGraph;

/// A GraphQL literal that can be coerced according to a type.
pub trait MaybeCoercible<T> {
    fn coerce(&self, using_type: &T) -> Option<r::Value>;
}

impl MaybeCoercible<EnumType> for q::Value {
    fn coerce(&self, using_type: &EnumType) -> Option<r::Value> {
        match self {
            q::Value::Null => Some(r::Value::Null),
            q::Value::Enum(name) => using_type
                .values
                .iter()
                .find(|value| *value == name)
                .map(|_| r::Value::Enum(name.clone())),
            _ => None,
        }
    }
}

impl MaybeCoercible<ScalarType> for q::Value {
    fn coerce(&self, using_type: &ScalarType) -> Option<r::Value> {
        match (using_type.name.as_str(), self) {
            (_, q::Value::Null) => Some(r::Value::Null),
            ("Boolean", q::Value::Boolean(b)) => Some(r::Value::Boolean(*b)),
            ("Int", q::Value::Int(num)) => {
                let num = num.as_i64()?;
                if i32::MIN as i64 <= num && num <= i32::MAX as i64 {
                    Some(r::Value::Int(num))
                } else {
                    None
                }
            }
            ("Float", q::Value::Float(f)) => Some(r::Value::Float(*f)),
            ("Float", q::Value::Int(num)) => Some(r::Value::Float(num.as_i64()? as f64)),
            ("String", q::Value::String(s)) => Some(r::Value::String(s.clone())),
            ("ID", q::Value::String(s)) => Some(r::Value::String(s.clone())),
            ("ID", q::Value::Int(num)) => Some(r::Value::String(num.as_i64()?.to_string())),
            ("Int" | "Float" | "String" | "Boolean" | "ID", _) => None,
            // Custom scalars are passed to resolvers as written.
            (_, value) => literal_value(value),
        }
    }
}

/// Converts a literal that contains no variables into a value.
fn literal_value(value: &q::Value) -> Option<r::Value> {
    Some(match value {
        q::Value::Variable(_) => return None,
        q::Value::Int(num) => r::Value::Int(num.as_i64()?),
        q::Value::Float(f) => r::Value::Float(*f),
        q::Value::String(s) => r::Value::String(s.clone()),
        q::Value::Boolean(b) => r::Value::Boolean(*b),
        q::Value::Null => r::Value::Null,
        q::Value::Enum(e) => r::Value::Enum(e.clone()),
        q::Value::List(values) => r::Value::List(
            values
                .iter()
                .map(literal_value)
                .collect::<Option<Vec<_>>>()?,
        ),
        q::Value::Object(map) => r::Value::Object(
            map.iter()
                .map(|(key, value)| Some((key.clone(), literal_value(value)?)))
                .collect::<Option<r::Object>>()?,
        ),
    })
}

/// Turns a variable value into a literal of type `ty`. Variables arrive as
/// JSON, which carries enum values as strings.
pub(crate) fn variable_literal(
    value: r::Value,
    ty: &TypeDescriptor,
    graph: &TypeGraph,
) -> q::Value {
    match (ty, value) {
        (TypeDescriptor::NonNull(t), value) => variable_literal(value, t, graph),
        (TypeDescriptor::List(t), r::Value::List(values)) => q::Value::List(
            values
                .into_iter()
                .map(|value| variable_literal(value, t, graph))
                .collect(),
        ),
        (TypeDescriptor::List(_), value) => q::Value::from(value),
        (t, value) => match (graph.lookup(t.name()), value) {
            (Some(TypeDescriptor::Enum(_)), r::Value::String(name)) => q::Value::Enum(name),
            (Some(TypeDescriptor::InputObject(t)), r::Value::Object(object)) => q::Value::Object(
                object
                    .into_iter()
                    .map(|(key, value)| {
                        let literal = match t.fields.iter().find(|def| def.name == key) {
                            Some(def) => variable_literal(value, &def.value_type, graph),
                            None => q::Value::from(value),
                        };
                        (key, literal)
                    })
                    .collect(),
            ),
            (_, value) => q::Value::from(value),
        },
    }
}

fn coerce_to_definition(
    value: &q::Value,
    definition: &str,
    graph: &TypeGraph,
    variables: &HashMap<String, r::Value>,
) -> Option<r::Value> {
    match graph.lookup(definition)? {
        // Accept enum values if they match a value in the enum type
        TypeDescriptor::Enum(t) => value.coerce(t),

        // Try to coerce Scalar values
        TypeDescriptor::Scalar(t) => value.coerce(t),

        // Try to coerce InputObject values; every provided field must be
        // declared, and declared fields are coerced in declaration order
        TypeDescriptor::InputObject(t) => match value {
            q::Value::Object(object) => {
                if object
                    .keys()
                    .any(|name| !t.fields.iter().any(|def| &def.name == name))
                {
                    return None;
                }
                let mut coerced_object = r::Object::new();
                for def in &t.fields {
                    let value = object.get(&def.name).cloned();
                    let value = coerce_input_value(def.position, value, def, graph, variables);
                    if let Some(value) = value.ok()? {
                        coerced_object.insert(def.name.clone(), value);
                    }
                }
                Some(r::Value::Object(coerced_object))
            }
            _ => None,
        },

        // Output types never accept input
        _ => None,
    }
}

/// Coerces an argument into a value.
///
/// `Ok(None)` happens when no value is found for a nullable type.
pub(crate) fn coerce_input_value(
    pos: Pos,
    mut value: Option<q::Value>,
    def: &ArgumentDescriptor,
    graph: &TypeGraph,
    variable_values: &HashMap<String, r::Value>,
) -> Result<Option<r::Value>, QueryExecutionError> {
    if let Some(q::Value::Variable(name)) = &value {
        value = variable_values
            .get(name)
            .cloned()
            .map(|value| variable_literal(value, &def.value_type, graph));
    };

    // Use the default value if necessary and present.
    value = value.or_else(|| def.default_value.clone());

    // Extract value, checking for null or missing.
    let value = match value {
        None => {
            return if sast::is_non_null_type(&def.value_type) {
                Err(QueryExecutionError::MissingArgumentError(
                    pos,
                    def.name.to_owned(),
                ))
            } else {
                Ok(None)
            };
        }
        Some(value) => value,
    };

    Ok(Some(
        coerce_value(&value, &def.value_type, graph, variable_values).ok_or_else(|| {
            QueryExecutionError::InvalidArgumentError(pos, def.name.to_owned(), value.clone())
        })?,
    ))
}

pub(crate) fn coerce_value(
    value: &q::Value,
    ty: &TypeDescriptor,
    graph: &TypeGraph,
    variable_values: &HashMap<String, r::Value>,
) -> Option<r::Value> {
    if let q::Value::Variable(name) = value {
        let value = variable_values
            .get(name)
            .cloned()
            .map(|value| variable_literal(value, ty, graph))
            .unwrap_or(q::Value::Null);
        return coerce_value(&value, ty, graph, variable_values);
    }

    match (ty, value) {
        // Null values cannot be coerced into non-null types.
        (TypeDescriptor::NonNull(_), q::Value::Null) => None,

        // Non-null values may be coercible into non-null types
        (TypeDescriptor::NonNull(t), _) => coerce_value(value, t, graph, variable_values),

        // Nullable types can be null.
        (_, q::Value::Null) => Some(r::Value::Null),

        // List values are coercible if their values are coercible into the
        // inner type.
        (TypeDescriptor::List(t), q::Value::List(values)) => values
            .iter()
            .map(|value| coerce_value(value, t, graph, variable_values))
            .collect::<Option<Vec<_>>>()
            .map(r::Value::List),

        // Otherwise the list type is not coercible.
        (TypeDescriptor::List(_), _) => None,

        // Resolve named types, then try to coerce the value into the resolved type
        (t, _) => coerce_to_definition(value, t.name(), graph, variable_values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn graph() -> TypeGraph {
        Schema::parse(
            "
            type Query { a: Int }
            enum LengthUnit { METER FOOT }
            input ReviewInput { stars: Int! commentary: String }
            scalar Time
            ",
            "test",
        )
        .unwrap()
        .graph()
        .clone()
    }

    fn named(name: &str) -> TypeDescriptor {
        TypeDescriptor::Named(name.to_string())
    }

    fn coerce(value: q::Value, ty: &TypeDescriptor) -> Option<r::Value> {
        coerce_value(&value, ty, &graph(), &HashMap::new())
    }

    #[test]
    fn enum_members_match_case_sensitively() {
        let unit = named("LengthUnit");
        assert_eq!(
            coerce(q::Value::Enum("FOOT".to_string()), &unit),
            Some(r::Value::Enum("FOOT".to_string()))
        );
        assert_eq!(coerce(q::Value::Enum("foot".to_string()), &unit), None);
        assert_eq!(coerce(q::Value::String("FOOT".to_string()), &unit), None);
        assert_eq!(coerce(q::Value::Enum("FURLONG".to_string()), &unit), None);
    }

    #[test]
    fn builtin_scalars() {
        let int = q::Value::Int(q::Number::from(7));
        assert_eq!(coerce(int.clone(), &named("Int")), Some(r::Value::Int(7)));
        assert_eq!(coerce(int.clone(), &named("Float")), Some(r::Value::Float(7.0)));
        assert_eq!(
            coerce(int.clone(), &named("ID")),
            Some(r::Value::String("7".to_string()))
        );
        assert_eq!(coerce(int, &named("String")), None);
        assert_eq!(coerce(q::Value::Float(1.5), &named("Int")), None);
        assert_eq!(
            coerce(q::Value::Float(1.5), &named("Time")),
            Some(r::Value::Float(1.5))
        );
    }

    #[test]
    fn nulls_and_lists() {
        let non_null = TypeDescriptor::NonNull(Box::new(named("Int")));
        assert_eq!(coerce(q::Value::Null, &non_null), None);
        assert_eq!(coerce(q::Value::Null, &named("Int")), Some(r::Value::Null));

        let list = TypeDescriptor::List(Box::new(named("Int")));
        assert_eq!(
            coerce(
                q::Value::List(vec![
                    q::Value::Int(q::Number::from(1)),
                    q::Value::Int(q::Number::from(2))
                ]),
                &list
            ),
            Some(r::Value::List(vec![r::Value::Int(1), r::Value::Int(2)]))
        );
        assert_eq!(
            coerce(
                q::Value::List(vec![q::Value::String("x".to_string())]),
                &list
            ),
            None
        );
    }

    #[test]
    fn input_objects() {
        let input = named("ReviewInput");
        let mut object = std::collections::BTreeMap::new();
        object.insert("stars".to_string(), q::Value::Int(q::Number::from(5)));
        assert_eq!(
            coerce(q::Value::Object(object.clone()), &input),
            Some(object! { stars: 5 })
        );

        object.insert("rating".to_string(), q::Value::Int(q::Number::from(5)));
        assert_eq!(coerce(q::Value::Object(object), &input), None);

        assert_eq!(
            coerce(q::Value::Object(Default::default()), &input),
            None
        );
    }

    #[test]
    fn arguments_use_variables_then_defaults() {
        let def = ArgumentDescriptor {
            name: "unit".to_string(),
            value_type: named("LengthUnit"),
            default_value: Some(q::Value::Enum("METER".to_string())),
            position: Pos::default(),
        };
        let graph = graph();
        let mut variables = HashMap::new();

        assert_eq!(
            coerce_input_value(Pos::default(), None, &def, &graph, &variables).unwrap(),
            Some(r::Value::Enum("METER".to_string()))
        );

        variables.insert("unit".to_string(), r::Value::String("FOOT".to_string()));
        assert_eq!(
            coerce_input_value(
                Pos::default(),
                Some(q::Value::Variable("unit".to_string())),
                &def,
                &graph,
                &variables
            )
            .unwrap(),
            Some(r::Value::Enum("FOOT".to_string()))
        );

        let err = coerce_input_value(
            Pos::default(),
            Some(q::Value::Enum("FURLONG".to_string())),
            &def,
            &graph,
            &variables,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QueryExecutionError::InvalidArgumentError(_, name, _) if name == "unit"
        ));
    }

    #[test]
    fn missing_required_arguments() {
        let def = ArgumentDescriptor {
            name: "id".to_string(),
            value_type: TypeDescriptor::NonNull(Box::new(named("ID"))),
            default_value: None,
            position: Pos::default(),
        };
        let err =
            coerce_input_value(Pos::default(), None, &def, &graph(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, QueryExecutionError::MissingArgumentError(..)));
    }
}
