//! Selection-set depth.
//!
//! - A field with a sub-selection adds one level
//! - An inline fragment adds nothing; its selections sit at the level of
//!   the enclosing selection set
//! - A named fragment spread counts as one level. Fragment bodies are not
//!   resolved, so this is an approximation.

use graphql_parser::query::{Selection, SelectionSet};

/// Maximum nesting below the operation's root selection set.
pub fn selection_depth(set: &SelectionSet<'_, String>) -> usize {
    set.items
        .iter()
        .map(|item| match item {
            Selection::Field(field) if field.selection_set.items.is_empty() => 0,
            Selection::Field(field) => 1 + selection_depth(&field.selection_set),
            Selection::InlineFragment(fragment) => selection_depth(&fragment.selection_set),
            Selection::FragmentSpread(_) => 1,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use graphql_parser::query::{Definition, OperationDefinition};

    use super::*;

    fn depth_of(query: &str) -> usize {
        let doc = graphql_parser::parse_query::<String>(query).unwrap();
        let set = doc
            .definitions
            .iter()
            .find_map(|d| match d {
                Definition::Operation(OperationDefinition::SelectionSet(s)) => Some(s),
                Definition::Operation(OperationDefinition::Query(q)) => Some(&q.selection_set),
                _ => None,
            })
            .unwrap();
        selection_depth(set)
    }

    #[test]
    fn test_flat_query() {
        assert_eq!(depth_of("{ a b c }"), 0);
    }

    #[test]
    fn test_nested_fields() {
        assert_eq!(depth_of("{ team { applications { nodes { name } } } }"), 3);
    }

    #[test]
    fn test_takes_deepest_branch() {
        assert_eq!(depth_of("{ a { b } c { d { e } } }"), 2);
    }

    #[test]
    fn test_inline_fragment_is_transparent() {
        assert_eq!(depth_of("{ node { ... on Team { slug } } }"), 1);
        assert_eq!(depth_of("{ node { ... on Team { members { email } } } }"), 2);
    }

    #[test]
    fn test_fragment_spread_counts_one() {
        assert_eq!(
            depth_of("query Q { team { ...TeamFields } } fragment TeamFields on Team { a { b } }"),
            2
        );
    }
}
