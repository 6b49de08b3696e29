//! Read-only exploration over a [`SchemaIndex`].
//!
//! Every function returns a serializable view so tool handlers can hand the
//! result straight to the caller. List and summary views truncate
//! descriptions; detail views keep them whole.

use serde::Serialize;
use thiserror::Error;

use crate::schema::index::{
    EnumValueDefinition, FieldDefinition, InputValueDefinition, SchemaIndex, TypeDefinition,
    TypeKind,
};

/// Description length in list and summary views.
pub const SUMMARY_DESCRIPTION_LEN: usize = 120;

/// Default cap on search hits.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

const MAX_SUGGESTIONS: usize = 5;

/// Lookup failures. Not-found variants carry close matches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExploreError {
    #[error("Type '{name}' not found{}", did_you_mean(.suggestions))]
    TypeNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Field '{field}' not found on type '{type_name}'{}", did_you_mean(.suggestions))]
    FieldNotFound {
        type_name: String,
        field: String,
        suggestions: Vec<String>,
    },

    #[error("'{name}' is a {actual}, not a {expected}")]
    WrongKind {
        name: String,
        expected: TypeKind,
        actual: TypeKind,
    },

    #[error("Search term must not be empty")]
    EmptySearchTerm,
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}?", suggestions.join(", "))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeSummary {
    pub name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentView {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetail {
    pub parent_type: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub return_kind: Option<TypeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub arguments: Vec<ArgumentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<EnumValueView>,
}

/// Full view of one type. Empty sections are omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDetail {
    pub name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_fields: Vec<ArgumentView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<EnumValueView>,
    /// Union members, or implementors for an interface.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub possible_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLocation {
    TypeName,
    TypeDescription,
    FieldName,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub type_name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub matched: MatchLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub term: String,
    /// Matches found before the limit was applied.
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleTypes {
    pub name: String,
    pub kind: TypeKind,
    pub types: Vec<TypeSummary>,
}

/// All named types, optionally filtered by kind. Introspection types are
/// hidden.
pub fn list_types(index: &SchemaIndex, kind: Option<TypeKind>) -> Vec<TypeSummary> {
    index
        .types()
        .filter(|t| !t.name.starts_with("__"))
        .filter(|t| kind.is_none_or(|k| t.kind == k))
        .map(type_summary)
        .collect()
}

pub fn get_type(index: &SchemaIndex, name: &str) -> Result<TypeDetail, ExploreError> {
    let ty = find_type(index, name)?;
    let possible_types = match ty.kind {
        TypeKind::Union => ty.union_members.clone(),
        TypeKind::Interface => index
            .implementors(&ty.name)
            .into_iter()
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };

    Ok(TypeDetail {
        name: ty.name.clone(),
        kind: ty.kind,
        description: ty.description.clone(),
        interfaces: ty.interfaces.clone(),
        fields: ty.fields.iter().map(field_summary).collect(),
        input_fields: ty.input_fields.iter().map(argument_view).collect(),
        enum_values: ty.enum_values.iter().map(enum_value_view).collect(),
        possible_types,
    })
}

/// Fields of the query root. Empty when the schema has none.
pub fn list_queries(index: &SchemaIndex) -> Vec<FieldSummary> {
    index.query_fields().iter().map(field_summary).collect()
}

/// Fields of the mutation root, for discovery only; mutations are never
/// executed.
pub fn list_mutations(index: &SchemaIndex) -> Vec<FieldSummary> {
    index.mutation_fields().iter().map(field_summary).collect()
}

pub fn get_field(
    index: &SchemaIndex,
    type_name: &str,
    field_name: &str,
) -> Result<FieldDetail, ExploreError> {
    let ty = find_type(index, type_name)?;
    let field = ty.field(field_name).ok_or_else(|| ExploreError::FieldNotFound {
        type_name: ty.name.clone(),
        field: field_name.to_string(),
        suggestions: suggest(field_name, ty.fields.iter().map(|f| f.name.as_str())),
    })?;

    Ok(FieldDetail {
        parent_type: ty.name.clone(),
        name: field.name.clone(),
        field_type: field.field_type.to_string(),
        return_kind: index.lookup(field.field_type.base_name()).map(|t| t.kind),
        description: field.description.clone(),
        arguments: field.arguments.iter().map(argument_view).collect(),
        deprecation_reason: field.deprecation.clone(),
    })
}

pub fn get_enum(index: &SchemaIndex, name: &str) -> Result<EnumView, ExploreError> {
    let ty = find_kind(index, name, TypeKind::Enum)?;
    Ok(EnumView {
        name: ty.name.clone(),
        description: ty.description.clone(),
        values: ty.enum_values.iter().map(enum_value_view).collect(),
    })
}

/// Case-insensitive substring search over type names, type descriptions and
/// field names. Each type contributes at most one type-level hit.
pub fn search(index: &SchemaIndex, term: &str, limit: usize) -> Result<SearchResults, ExploreError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ExploreError::EmptySearchTerm);
    }
    let needle = term.to_lowercase();
    let mut hits = Vec::new();

    for ty in index.types().filter(|t| !t.name.starts_with("__")) {
        let description_matches = ty
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle));
        let type_match = if ty.name.to_lowercase().contains(&needle) {
            Some(MatchLocation::TypeName)
        } else if description_matches {
            Some(MatchLocation::TypeDescription)
        } else {
            None
        };
        if let Some(matched) = type_match {
            hits.push(SearchHit {
                type_name: ty.name.clone(),
                kind: ty.kind,
                field: None,
                matched,
                description: summarize(ty.description.as_deref()),
            });
        }

        let field_names = ty
            .fields
            .iter()
            .map(|f| (&f.name, &f.description))
            .chain(ty.input_fields.iter().map(|f| (&f.name, &f.description)));
        for (name, description) in field_names {
            if name.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    type_name: ty.name.clone(),
                    kind: ty.kind,
                    field: Some(name.clone()),
                    matched: MatchLocation::FieldName,
                    description: summarize(description.as_deref()),
                });
            }
        }
    }

    let total = hits.len();
    hits.truncate(limit);
    Ok(SearchResults {
        term: term.to_string(),
        total,
        hits,
    })
}

pub fn implementors(index: &SchemaIndex, interface: &str) -> Result<PossibleTypes, ExploreError> {
    let ty = find_kind(index, interface, TypeKind::Interface)?;
    Ok(possible_types(index, ty, index.implementors(&ty.name)))
}

pub fn union_members(index: &SchemaIndex, union: &str) -> Result<PossibleTypes, ExploreError> {
    let ty = find_kind(index, union, TypeKind::Union)?;
    Ok(possible_types(index, ty, index.union_members(&ty.name)))
}

fn possible_types(index: &SchemaIndex, ty: &TypeDefinition, names: Vec<&str>) -> PossibleTypes {
    PossibleTypes {
        name: ty.name.clone(),
        kind: ty.kind,
        types: names
            .into_iter()
            .map(|name| match index.lookup(name) {
                Some(member) => type_summary(member),
                // Union members are not checked at parse time.
                None => TypeSummary {
                    name: name.to_string(),
                    kind: TypeKind::Object,
                    description: None,
                },
            })
            .collect(),
    }
}

fn find_type<'a>(index: &'a SchemaIndex, name: &str) -> Result<&'a TypeDefinition, ExploreError> {
    index.lookup(name).ok_or_else(|| ExploreError::TypeNotFound {
        name: name.to_string(),
        suggestions: suggest(name, index.types().map(|t| t.name.as_str())),
    })
}

fn find_kind<'a>(
    index: &'a SchemaIndex,
    name: &str,
    expected: TypeKind,
) -> Result<&'a TypeDefinition, ExploreError> {
    let ty = find_type(index, name)?;
    if ty.kind != expected {
        return Err(ExploreError::WrongKind {
            name: ty.name.clone(),
            expected,
            actual: ty.kind,
        });
    }
    Ok(ty)
}

fn type_summary(ty: &TypeDefinition) -> TypeSummary {
    TypeSummary {
        name: ty.name.clone(),
        kind: ty.kind,
        description: summarize(ty.description.as_deref()),
    }
}

fn field_summary(field: &FieldDefinition) -> FieldSummary {
    FieldSummary {
        name: field.name.clone(),
        field_type: field.field_type.to_string(),
        description: summarize(field.description.as_deref()),
        arguments: field
            .arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.value_type))
            .collect(),
        deprecation_reason: field.deprecation.clone(),
    }
}

fn argument_view(value: &InputValueDefinition) -> ArgumentView {
    ArgumentView {
        name: value.name.clone(),
        value_type: value.value_type.to_string(),
        description: value.description.clone(),
        default_value: value.default_value.clone(),
        required: value.is_required(),
    }
}

fn enum_value_view(value: &EnumValueDefinition) -> EnumValueView {
    EnumValueView {
        name: value.name.clone(),
        description: value.description.clone(),
        deprecation_reason: value.deprecation.clone(),
    }
}

/// Collapse whitespace and cut to [`SUMMARY_DESCRIPTION_LEN`] characters.
pub fn summarize(description: Option<&str>) -> Option<String> {
    let collapsed = description?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() <= SUMMARY_DESCRIPTION_LEN {
        return Some(collapsed);
    }
    let mut cut: String = collapsed
        .chars()
        .take(SUMMARY_DESCRIPTION_LEN - 3)
        .collect();
    cut.push_str("...");
    Some(cut)
}

/// Up to five names close to `wanted`: substring matches first, then small
/// edit distances.
fn suggest<'a>(wanted: &str, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let wanted_lower = wanted.to_lowercase();
    let threshold = (wanted.chars().count() / 3).max(2);

    let mut scored: Vec<(usize, &str)> = candidates
        .filter(|c| !c.starts_with("__"))
        .filter_map(|c| {
            let lower = c.to_lowercase();
            if lower == wanted_lower || lower.contains(&wanted_lower) || wanted_lower.contains(&lower)
            {
                return Some((0, c));
            }
            let distance = edit_distance(&wanted_lower, &lower);
            (distance <= threshold).then_some((distance, c))
        })
        .collect();

    scored.sort();
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, c)| c.to_string())
        .collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::remove_builtin_scalars;
    use crate::testing::SAMPLE_SCHEMA;

    fn index() -> SchemaIndex {
        SchemaIndex::parse(&remove_builtin_scalars(SAMPLE_SCHEMA)).unwrap()
    }

    #[test]
    fn test_list_types_by_kind() {
        let index = index();

        let enums: Vec<_> = list_types(&index, Some(TypeKind::Enum))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(enums.contains(&"TeamRole".to_string()));
        assert!(list_types(&index, Some(TypeKind::Enum))
            .iter()
            .all(|t| t.kind == TypeKind::Enum));

        let all = list_types(&index, None);
        assert!(all.iter().any(|t| t.name == "Boolean"));
        assert!(all.windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[test]
    fn test_get_type_interface_lists_implementors() {
        let detail = get_type(&index(), "Node").unwrap();
        assert_eq!(detail.kind, TypeKind::Interface);
        assert_eq!(detail.possible_types, vec!["Application", "Secret", "Team"]);
    }

    #[test]
    fn test_get_type_shows_interfaces_of_interface() {
        let index = SchemaIndex::parse(
            "type Query { r: Resource }\n\
             interface Node { id: ID! }\n\
             interface Resource implements Node { id: ID! }",
        )
        .unwrap();

        let detail = get_type(&index, "Resource").unwrap();
        assert_eq!(detail.interfaces, vec!["Node"]);
    }

    #[test]
    fn test_get_type_not_found_suggests() {
        let err = get_type(&index(), "Tema").unwrap_err();
        match &err {
            ExploreError::TypeNotFound { suggestions, .. } => {
                assert!(suggestions.contains(&"Team".to_string()));
                assert!(suggestions.len() <= MAX_SUGGESTIONS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Did you mean"));
    }

    #[test]
    fn test_get_field_detail() {
        let detail = get_field(&index(), "Team", "applications").unwrap();
        assert_eq!(detail.parent_type, "Team");
        let first = detail.arguments.iter().find(|a| a.name == "first").unwrap();
        assert_eq!(first.default_value.as_deref(), Some("20"));
        assert!(!first.required);
        assert_eq!(detail.return_kind, Some(TypeKind::Object));
    }

    #[test]
    fn test_get_field_not_found() {
        let err = get_field(&index(), "Team", "slugg").unwrap_err();
        assert!(matches!(
            err,
            ExploreError::FieldNotFound { ref suggestions, .. } if suggestions.contains(&"slug".to_string())
        ));
    }

    #[test]
    fn test_get_enum_and_wrong_kind() {
        let index = index();
        let role = get_enum(&index, "TeamRole").unwrap();
        let names: Vec<_> = role.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["OWNER", "MEMBER", "VIEWER"]);

        let err = get_enum(&index, "Team").unwrap_err();
        assert_eq!(
            err,
            ExploreError::WrongKind {
                name: "Team".into(),
                expected: TypeKind::Enum,
                actual: TypeKind::Object,
            }
        );
    }

    #[test]
    fn test_list_roots() {
        let index = index();
        assert!(list_queries(&index).iter().any(|f| f.name == "team"));
        let mutations: Vec<_> = list_mutations(&index).into_iter().map(|f| f.name).collect();
        assert_eq!(mutations, vec!["createSecret", "deleteTeam"]);
    }

    #[test]
    fn test_search() {
        let index = index();
        let results = search(&index, "TEAM", DEFAULT_SEARCH_LIMIT).unwrap();
        assert!(results
            .hits
            .iter()
            .any(|h| h.type_name == "Team" && h.matched == MatchLocation::TypeName));
        assert!(results
            .hits
            .iter()
            .any(|h| h.field.as_deref() == Some("team")));

        let limited = search(&index, "e", 2).unwrap();
        assert_eq!(limited.hits.len(), 2);
        assert!(limited.total > 2);

        assert_eq!(search(&index, "  ", 10).unwrap_err(), ExploreError::EmptySearchTerm);
    }

    #[test]
    fn test_union_members_and_implementors() {
        let index = index();
        let members = union_members(&index, "SearchResult").unwrap();
        let names: Vec<_> = members.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Team", "Application"]);

        assert!(matches!(
            implementors(&index, "SearchResult"),
            Err(ExploreError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_summarize_truncates() {
        let long = "word ".repeat(60);
        let summary = summarize(Some(&long)).unwrap();
        assert_eq!(summary.chars().count(), SUMMARY_DESCRIPTION_LEN);
        assert!(summary.ends_with("..."));

        assert_eq!(summarize(Some("  two\n lines ")).as_deref(), Some("two lines"));
        assert_eq!(summarize(Some("   ")), None);
        assert_eq!(summarize(None), None);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("team", "tema"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("slug", "slug"), 0);
    }
}
