//! Secret-exposure scan for query selection sets.
//!
//! Fields and inline fragments are checked against the schema: a field whose
//! base return type, or a fragment whose type condition, is in the
//! [`ForbiddenTypeSet`] rejects the query.
//!
//! Named fragment spreads are only checked by name: a spread whose name
//! contains "secret" (any case) is rejected. Fragment bodies are not
//! resolved, so a fragment that selects a forbidden type under an innocuous
//! name is not caught here.

use std::collections::BTreeSet;

use graphql_parser::query::{Selection, SelectionSet, TypeCondition};

use crate::schema::{SchemaIndex, TypeDefinition};
use crate::validation::Violation;

/// Types that carry secret material unless configured otherwise.
pub const DEFAULT_FORBIDDEN_TYPES: &[&str] = &[
    "Secret",
    "SecretConnection",
    "SecretEdge",
    "SecretValue",
    "SecretValueConnection",
    "ServiceAccountToken",
    "ServiceAccountTokenConnection",
    "ServiceAccountTokenEdge",
    "CreateServiceAccountTokenPayload",
];

/// Closed set of type names that queries must never reach.
///
/// Built once at startup and shared read-only with the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenTypeSet {
    names: BTreeSet<String>,
}

impl ForbiddenTypeSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The default set plus `extra`.
    pub fn with_additional<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.names.extend(extra.into_iter().map(Into::into));
        set
    }

    /// Exact, case-sensitive match on a base type name.
    pub fn contains(&self, type_name: &str) -> bool {
        self.names.contains(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ForbiddenTypeSet {
    fn default() -> Self {
        Self::new(DEFAULT_FORBIDDEN_TYPES.iter().copied())
    }
}

/// Walk `set` (selected on `parent`) and stop at the first path into a
/// forbidden type.
pub fn scan_selection_set(
    index: &SchemaIndex,
    forbidden: &ForbiddenTypeSet,
    parent: &TypeDefinition,
    set: &SelectionSet<'_, String>,
) -> Result<(), Violation> {
    for item in &set.items {
        match item {
            Selection::Field(field) => {
                // __typename and introspection never reach schema data.
                if field.name.starts_with("__") {
                    continue;
                }
                let Some(def) = parent.field(&field.name) else {
                    continue;
                };
                let base = def.field_type.base_name();
                if forbidden.contains(base) {
                    return Err(Violation::secret_field(&field.name, base));
                }
                if !field.selection_set.items.is_empty()
                    && let Some(target) = index.lookup(base)
                {
                    scan_selection_set(index, forbidden, target, &field.selection_set)?;
                }
            }
            Selection::InlineFragment(fragment) => {
                let target = match &fragment.type_condition {
                    Some(TypeCondition::On(name)) => {
                        if forbidden.contains(name) {
                            return Err(Violation::secret_type_condition(name));
                        }
                        index.lookup(name).unwrap_or(parent)
                    }
                    None => parent,
                };
                scan_selection_set(index, forbidden, target, &fragment.selection_set)?;
            }
            Selection::FragmentSpread(spread) => {
                if spread.fragment_name.to_lowercase().contains("secret") {
                    return Err(Violation::secret_fragment_spread(&spread.fragment_name));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set() {
        let set = ForbiddenTypeSet::default();
        assert!(set.contains("Secret"));
        assert!(set.contains("SecretConnection"));
        assert!(!set.contains("secret"));
        assert!(!set.contains("Team"));
    }

    #[test]
    fn test_with_additional() {
        let set = ForbiddenTypeSet::with_additional(["ApiKey"]);
        assert!(set.contains("ApiKey"));
        assert!(set.contains("Secret"));
        assert_eq!(set.len(), DEFAULT_FORBIDDEN_TYPES.len() + 1);
    }

    #[test]
    fn test_custom_set_replaces_defaults() {
        let set = ForbiddenTypeSet::new(["Password"]);
        assert!(set.contains("Password"));
        assert!(!set.contains("Secret"));
    }
}
