use indexmap::IndexMap;
use trellis::prelude::*;

/// Utilities for working with the type graph and parsed schema ASTs.
pub mod ast;

/// Construction-time checks of type graphs.
pub mod validation;

pub use self::ast::{
    ArgumentDescriptor, EnumType, FieldDescriptor, InputObjectType, InterfaceType, ObjectType,
    ScalarType, TypeDescriptor, UnionType,
};
pub use self::validation::{ConstructionError, Strings};

use self::ast::BUILTIN_SCALARS;

/// Read-only map from type name to type definition. Built once when the
/// schema is loaded and shared by all requests.
#[derive(Clone, Debug, Default)]
pub struct TypeGraph {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeGraph {
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.types.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// The object types a value of type `name` can have at runtime: the
    /// type itself for objects, implementors for interfaces and members
    /// for unions, in declaration order.
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        match self.lookup(name) {
            Some(TypeDescriptor::Object(t)) => vec![t.name.as_str()],
            Some(TypeDescriptor::Interface(t)) => {
                t.possible_types.iter().map(String::as_str).collect()
            }
            Some(TypeDescriptor::Union(t)) => t.members.iter().map(String::as_str).collect(),
            _ => vec![],
        }
    }

    /// Whether a type condition on `condition` can match a value whose
    /// type is `parent`.
    pub fn types_overlap(&self, parent: &str, condition: &str) -> bool {
        let parent = self.possible_types(parent);
        self.possible_types(condition)
            .iter()
            .any(|t| parent.contains(t))
    }

    /// Whether a value with concrete object type `object_type` satisfies
    /// a type condition on `condition`.
    pub fn condition_applies(&self, object_type: &str, condition: &str) -> bool {
        self.possible_types(condition).contains(&object_type)
    }

    fn insert(&mut self, t: TypeDescriptor) -> Result<(), ConstructionError> {
        let name = t.name().to_string();
        if self.types.contains_key(&name) {
            return Err(ConstructionError::DuplicateType(name));
        }
        self.types.insert(name, t);
        Ok(())
    }
}

/// A parsed schema: the type graph plus its root operation types.
#[derive(Clone, Debug)]
pub struct Schema {
    /// Identifies the schema source in error messages.
    pub id: String,
    pub document: s::Document,
    graph: TypeGraph,
    query_type: String,
    mutation_type: Option<String>,
}

impl Schema {
    /// Parses schema text into a type graph.
    pub fn parse(text: &str, id: impl Into<String>) -> Result<Self, ConstructionError> {
        let id = id.into();
        let document = s::parse_schema::<String>(text)
            .map_err(|e| ConstructionError::ParseError(id.clone(), e.to_string()))?
            .into_static();
        Self::new(id, document)
    }

    /// Builds the type graph of an already parsed schema document.
    pub fn new(id: String, document: s::Document) -> Result<Self, ConstructionError> {
        let mut graph = TypeGraph::default();
        for name in BUILTIN_SCALARS {
            graph.insert(TypeDescriptor::Scalar(ScalarType {
                name: name.to_string(),
            }))?;
        }

        let mut query_type = String::from("Query");
        let mut mutation_type = None;

        for definition in &document.definitions {
            match definition {
                s::Definition::SchemaDefinition(schema) => {
                    if let Some(name) = &schema.query {
                        query_type = name.clone();
                    }
                    mutation_type = schema.mutation.clone();
                }
                s::Definition::TypeDefinition(t) => graph.insert(type_descriptor(t))?,
                s::Definition::TypeExtension(_) | s::Definition::DirectiveDefinition(_) => {}
            }
        }

        if mutation_type.is_none() && graph.lookup("Mutation").is_some() {
            mutation_type = Some("Mutation".to_string());
        }

        // Interfaces learn their implementors in declaration order.
        let mut implementors: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, t) in graph.types() {
            if let TypeDescriptor::Object(object) = t {
                for interface in &object.interfaces {
                    implementors
                        .entry(interface.clone())
                        .or_default()
                        .push(name.to_string());
                }
            }
        }
        for (interface, objects) in implementors {
            if let Some(TypeDescriptor::Interface(t)) = graph.types.get_mut(&interface) {
                t.possible_types = objects;
            }
        }

        validation::validate_type_graph(&graph)?;

        match graph.lookup(&query_type) {
            Some(TypeDescriptor::Object(_)) => {}
            Some(_) => return Err(ConstructionError::NotAnObjectType(query_type)),
            None => return Err(ConstructionError::NoRootQueryType(query_type)),
        }
        if let Some(mutation_type) = &mutation_type {
            match graph.lookup(mutation_type) {
                Some(TypeDescriptor::Object(_)) => {}
                Some(_) => return Err(ConstructionError::NotAnObjectType(mutation_type.clone())),
                None => {
                    return Err(ConstructionError::DanglingReference(
                        "schema".to_string(),
                        mutation_type.clone(),
                    ))
                }
            }
        }

        Ok(Schema {
            id,
            document,
            graph,
            query_type,
            mutation_type,
        })
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.graph.lookup(name)
    }

    pub fn query_type(&self) -> &ObjectType {
        match self.graph.lookup(&self.query_type) {
            Some(TypeDescriptor::Object(t)) => t,
            // Checked when the schema was built.
            _ => unreachable!("root query type is an object type"),
        }
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        match self.graph.lookup(self.mutation_type.as_ref()?) {
            Some(TypeDescriptor::Object(t)) => Some(t),
            _ => None,
        }
    }
}

fn type_descriptor(t: &s::TypeDefinition) -> TypeDescriptor {
    match t {
        s::TypeDefinition::Scalar(t) => TypeDescriptor::Scalar(ScalarType {
            name: t.name.clone(),
        }),
        s::TypeDefinition::Enum(t) => TypeDescriptor::Enum(EnumType {
            name: t.name.clone(),
            values: t.values.iter().map(|value| value.name.clone()).collect(),
        }),
        s::TypeDefinition::Object(t) => TypeDescriptor::Object(ObjectType {
            name: t.name.clone(),
            fields: ast::field_descriptors(&t.fields),
            interfaces: t.implements_interfaces.clone(),
        }),
        s::TypeDefinition::Interface(t) => TypeDescriptor::Interface(InterfaceType {
            name: t.name.clone(),
            fields: ast::field_descriptors(&t.fields),
            possible_types: vec![],
        }),
        s::TypeDefinition::Union(t) => TypeDescriptor::Union(UnionType {
            name: t.name.clone(),
            members: t.types.clone(),
        }),
        s::TypeDefinition::InputObject(t) => TypeDescriptor::InputObject(InputObjectType {
            name: t.name.clone(),
            fields: ast::argument_descriptors(&t.fields),
        }),
    }
}
