use std::fmt;
use thiserror::Error;

use super::ast::{TypeDescriptor, BUILTIN_SCALARS};
use super::TypeGraph;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Strings(pub Vec<String>);

impl fmt::Display for Strings {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let s = self.0.join(", ");
        write!(f, "{}", s)
    }
}

/// A type graph or resolver registration that cannot be used to execute
/// requests.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("failed to parse schema `{0}`: {1}")]
    ParseError(String, String),
    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),
    #[error("type `{0}` refers to undefined type `{1}`")]
    DanglingReference(String, String),
    #[error("the schema has no root query type `{0}`")]
    NoRootQueryType(String),
    #[error("root type `{0}` is not an object type")]
    NotAnObjectType(String),
    #[error("type `{0}` implements `{1}`, which is not an interface")]
    NotAnInterface(String, String),
    #[error("union `{0}` has member `{1}`, which is not an object type")]
    InvalidUnionMember(String, String),
    #[error("field `{1}` of type `{0}` matches more than one capability: {2}")]
    AmbiguousBinding(String, String, Strings),
    #[error("field `{1}` of type `{0}` has no capability")]
    MissingCapability(String, String),
    #[error("resolver is registered for type `{0}`, which the schema does not define")]
    UnknownResolverType(String),
}

/// Checks that every named reference resolves and that the composite types
/// are well-formed.
pub(crate) fn validate_type_graph(graph: &TypeGraph) -> Result<(), ConstructionError> {
    for (name, t) in graph.types() {
        match t {
            TypeDescriptor::Object(object) => {
                for field in object.fields.values() {
                    check_field_references(graph, name, field)?;
                }
                for interface in &object.interfaces {
                    match graph.lookup(interface) {
                        Some(TypeDescriptor::Interface(_)) => {}
                        Some(_) => {
                            return Err(ConstructionError::NotAnInterface(
                                name.to_string(),
                                interface.clone(),
                            ))
                        }
                        None => {
                            return Err(ConstructionError::DanglingReference(
                                name.to_string(),
                                interface.clone(),
                            ))
                        }
                    }
                }
            }
            TypeDescriptor::Interface(interface) => {
                for field in interface.fields.values() {
                    check_field_references(graph, name, field)?;
                }
            }
            TypeDescriptor::Union(union) => {
                for member in &union.members {
                    match graph.lookup(member) {
                        Some(TypeDescriptor::Object(_)) => {}
                        Some(_) => {
                            return Err(ConstructionError::InvalidUnionMember(
                                name.to_string(),
                                member.clone(),
                            ))
                        }
                        None => {
                            return Err(ConstructionError::DanglingReference(
                                name.to_string(),
                                member.clone(),
                            ))
                        }
                    }
                }
            }
            TypeDescriptor::InputObject(input) => {
                for field in &input.fields {
                    check_reference(graph, name, &field.value_type)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_field_references(
    graph: &TypeGraph,
    type_name: &str,
    field: &super::ast::FieldDescriptor,
) -> Result<(), ConstructionError> {
    check_reference(graph, type_name, &field.field_type)?;
    for argument in &field.arguments {
        check_reference(graph, type_name, &argument.value_type)?;
    }
    Ok(())
}

fn check_reference(
    graph: &TypeGraph,
    type_name: &str,
    t: &TypeDescriptor,
) -> Result<(), ConstructionError> {
    let name = t.name();
    if graph.lookup(name).is_some() || BUILTIN_SCALARS.contains(&name) {
        Ok(())
    } else {
        Err(ConstructionError::DanglingReference(
            type_name.to_string(),
            name.to_string(),
        ))
    }
}
