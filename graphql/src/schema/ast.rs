use indexmap::IndexMap;
use trellis::prelude::*;

/// The names of the scalars every schema has.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A type in the type graph.
///
/// Named definitions (`Scalar` through `InputObject`) are the entries of the
/// graph. Field, argument and variable types are built from `List`,
/// `NonNull` and `Named`; a `Named` type is resolved against the graph when
/// execution reaches it.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    InputObject(InputObjectType),
    List(Box<TypeDescriptor>),
    NonNull(Box<TypeDescriptor>),
    Named(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarType {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub interfaces: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, FieldDescriptor>,
    /// Object types implementing the interface, in declaration order.
    pub possible_types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionType {
    pub name: String,
    /// Member types, in declaration order.
    pub members: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<ArgumentDescriptor>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: TypeDescriptor,
    pub arguments: Vec<ArgumentDescriptor>,
    pub position: Pos,
}

impl FieldDescriptor {
    pub fn argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}

/// A declared argument of a field, or a field of an input object.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub value_type: TypeDescriptor,
    pub default_value: Option<q::Value>,
    pub position: Pos,
}

impl TypeDescriptor {
    /// The name of a named definition, or of the named type at the core of
    /// a wrapped type.
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Scalar(t) => &t.name,
            TypeDescriptor::Enum(t) => &t.name,
            TypeDescriptor::Object(t) => &t.name,
            TypeDescriptor::Interface(t) => &t.name,
            TypeDescriptor::Union(t) => &t.name,
            TypeDescriptor::InputObject(t) => &t.name,
            TypeDescriptor::List(inner) | TypeDescriptor::NonNull(inner) => inner.name(),
            TypeDescriptor::Named(name) => name,
        }
    }

    /// Looks up a field of an object or interface type.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        match self {
            TypeDescriptor::Object(t) => t.fields.get(name),
            TypeDescriptor::Interface(t) => t.fields.get(name),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Interface(_) | TypeDescriptor::Union(_)
        )
    }

    /// Whether values of this definition are selected into with a
    /// sub-selection.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Object(_) | TypeDescriptor::Interface(_) | TypeDescriptor::Union(_)
        )
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_) | TypeDescriptor::InputObject(_)
        )
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TypeDescriptor::List(inner) => write!(f, "[{}]", inner),
            TypeDescriptor::NonNull(inner) => write!(f, "{}!", inner),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Converts a type reference of the parsed schema or request.
pub fn from_ast_type(t: &s::Type) -> TypeDescriptor {
    match t {
        s::Type::NamedType(name) => TypeDescriptor::Named(name.clone()),
        s::Type::ListType(inner) => TypeDescriptor::List(Box::new(from_ast_type(inner))),
        s::Type::NonNullType(inner) => TypeDescriptor::NonNull(Box::new(from_ast_type(inner))),
    }
}

pub fn is_non_null_type(t: &TypeDescriptor) -> bool {
    matches!(t, TypeDescriptor::NonNull(_))
}

pub(crate) fn field_descriptors(fields: &[s::Field]) -> IndexMap<String, FieldDescriptor> {
    fields
        .iter()
        .map(|field| {
            (
                field.name.clone(),
                FieldDescriptor {
                    name: field.name.clone(),
                    field_type: from_ast_type(&field.field_type),
                    arguments: argument_descriptors(&field.arguments),
                    position: field.position,
                },
            )
        })
        .collect()
}

pub(crate) fn argument_descriptors(values: &[s::InputValue]) -> Vec<ArgumentDescriptor> {
    values
        .iter()
        .map(|value| ArgumentDescriptor {
            name: value.name.clone(),
            value_type: from_ast_type(&value.value_type),
            default_value: value.default_value.clone(),
            position: value.position,
        })
        .collect()
}

/// Returns the name of a type definition of the parsed schema.
pub fn get_type_name(t: &s::TypeDefinition) -> &str {
    match t {
        s::TypeDefinition::Enum(t) => &t.name,
        s::TypeDefinition::InputObject(t) => &t.name,
        s::TypeDefinition::Interface(t) => &t.name,
        s::TypeDefinition::Object(t) => &t.name,
        s::TypeDefinition::Scalar(t) => &t.name,
        s::TypeDefinition::Union(t) => &t.name,
    }
}
