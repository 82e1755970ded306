use trellis::prelude::*;

/// A selection set with fragments flattened away and `@skip`/`@include`
/// already applied. Fields keep the order in which they appear in the
/// request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionSet {
    pub fields: Vec<Field>,
}

impl SelectionSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub position: Pos,
    pub alias: Option<String>,
    pub name: String,
    /// Arguments as written in the request; variables are substituted when
    /// they are coerced.
    pub arguments: Vec<(String, q::Value)>,
    pub selection_set: SelectionSet,
    /// The type conditions of the fragments the field was selected
    /// through, outermost first. The field only applies to values whose
    /// concrete type satisfies all of them.
    pub type_conditions: Vec<String>,
}

impl Field {
    /// Returns the response key of a field, which is either its name or its
    /// alias (if there is one).
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(self.name.as_str())
    }

    pub fn argument_value(&self, name: &str) -> Option<&q::Value> {
        crate::query::ast::get_argument_value(&self.arguments, name)
    }

    /// The type the field has to be looked up on: the innermost type
    /// condition, or `parent` if the field was selected directly.
    pub fn lookup_type<'a>(&'a self, parent: &'a str) -> &'a str {
        self.type_conditions
            .last()
            .map(String::as_str)
            .unwrap_or(parent)
    }

    pub fn is_typename(&self) -> bool {
        self.name == "__typename"
    }
}
