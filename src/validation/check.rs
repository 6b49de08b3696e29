//! Schema-aware checks run right after a query parses.
//!
//! Resolves every field of the first query operation and of every fragment
//! definition against the [`SchemaIndex`]. Non-query operations are left
//! alone; they are rejected by operation type later.

use std::collections::HashSet;

use graphql_parser::Pos;
use graphql_parser::query::{
    Definition, Document, Field, OperationDefinition, Selection, SelectionSet, TypeCondition,
};

use crate::schema::{SchemaIndex, TypeDefinition, TypeKind};
use crate::validation::result::Violation;

pub(crate) fn check_document(
    index: &SchemaIndex,
    document: &Document<'_, String>,
) -> Result<(), Violation> {
    let first = document.definitions.iter().find_map(|d| match d {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    // Only a leading query is resolved, fragments included; anything else
    // is rejected later by operation type.
    let selection_set = match first {
        Some(OperationDefinition::SelectionSet(set)) => set,
        Some(OperationDefinition::Query(query)) => &query.selection_set,
        _ => return Ok(()),
    };

    let mut fragment_names = HashSet::new();
    for definition in &document.definitions {
        if let Definition::Fragment(fragment) = definition
            && !fragment_names.insert(fragment.name.as_str())
        {
            return Err(Violation::invalid(format!(
                "There can be only one fragment named '{}'",
                fragment.name
            )));
        }
    }

    let checker = Checker {
        index,
        fragment_names,
    };

    for definition in &document.definitions {
        if let Definition::Fragment(fragment) = definition {
            let TypeCondition::On(type_name) = &fragment.type_condition;
            let target = checker.composite_type(type_name, fragment.position)?;
            checker.selection_set(target, &fragment.selection_set, false)?;
        }
    }

    let root = index
        .query_type()
        .ok_or_else(|| Violation::invalid("Schema does not define a query type"))?;
    checker.selection_set(root, selection_set, true)
}

struct Checker<'i, 'd> {
    index: &'i SchemaIndex,
    fragment_names: HashSet<&'d str>,
}

impl<'i> Checker<'i, '_> {
    fn composite_type(&self, name: &str, pos: Pos) -> Result<&'i TypeDefinition, Violation> {
        let ty = self
            .index
            .lookup(name)
            .ok_or_else(|| invalid_at(format!("Unknown type '{name}'"), pos))?;
        if !ty.kind.is_composite() {
            return Err(invalid_at(
                format!("Fragment cannot condition on non composite type '{name}'"),
                pos,
            ));
        }
        Ok(ty)
    }

    fn selection_set(
        &self,
        parent: &'i TypeDefinition,
        set: &SelectionSet<'_, String>,
        is_root: bool,
    ) -> Result<(), Violation> {
        for item in &set.items {
            match item {
                Selection::Field(field) => self.field(parent, field, is_root)?,
                Selection::InlineFragment(fragment) => {
                    let target = match &fragment.type_condition {
                        Some(TypeCondition::On(name)) => {
                            self.composite_type(name, fragment.position)?
                        }
                        None => parent,
                    };
                    self.selection_set(target, &fragment.selection_set, is_root)?;
                }
                Selection::FragmentSpread(spread) => {
                    if !self.fragment_names.contains(spread.fragment_name.as_str()) {
                        return Err(invalid_at(
                            format!("Unknown fragment '{}'", spread.fragment_name),
                            spread.position,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn field(
        &self,
        parent: &'i TypeDefinition,
        field: &Field<'_, String>,
        is_root: bool,
    ) -> Result<(), Violation> {
        let name = field.name.as_str();
        let has_selection = !field.selection_set.items.is_empty();

        if name == "__typename" {
            if has_selection {
                return Err(invalid_at(
                    "Field '__typename' must not have a selection",
                    field.position,
                ));
            }
            return Ok(());
        }
        // Introspection roots are served by the upstream itself.
        if is_root && (name == "__schema" || name == "__type") {
            return Ok(());
        }

        if parent.kind == TypeKind::Union {
            return Err(invalid_at(
                format!(
                    "Cannot query field '{name}' on union type '{}'; use an inline fragment",
                    parent.name
                ),
                field.position,
            ));
        }

        let def = parent.field(name).ok_or_else(|| {
            invalid_at(
                format!("Cannot query field '{name}' on type '{}'", parent.name),
                field.position,
            )
        })?;

        for (arg, _) in &field.arguments {
            if def.argument(arg).is_none() {
                return Err(invalid_at(
                    format!("Unknown argument '{arg}' on field '{}.{name}'", parent.name),
                    field.position,
                ));
            }
        }
        if let Some(missing) = def
            .arguments
            .iter()
            .find(|a| a.is_required() && !field.arguments.iter().any(|(n, _)| *n == a.name))
        {
            return Err(invalid_at(
                format!(
                    "Field '{}.{name}' argument '{}' of type '{}' is required",
                    parent.name, missing.name, missing.value_type
                ),
                field.position,
            ));
        }

        let return_type = def.field_type.base_name();
        let target = self.index.lookup(return_type).ok_or_else(|| {
            invalid_at(
                format!("Field '{name}' returns unknown type '{return_type}'"),
                field.position,
            )
        })?;

        match (target.kind.is_composite(), has_selection) {
            (true, true) => self.selection_set(target, &field.selection_set, false),
            (true, false) => Err(invalid_at(
                format!(
                    "Field '{name}' of type '{}' must have a selection of subfields",
                    def.field_type
                ),
                field.position,
            )),
            (false, true) => Err(invalid_at(
                format!(
                    "Field '{name}' must not have a selection since type '{}' has no subfields",
                    def.field_type
                ),
                field.position,
            )),
            (false, false) => Ok(()),
        }
    }
}

fn invalid_at(message: impl Into<String>, pos: Pos) -> Violation {
    Violation::invalid(format!(
        "{} (line {}, column {})",
        message.into(),
        pos.line,
        pos.column
    ))
}
