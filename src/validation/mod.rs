//! Query validation.
//!
//! [`QueryValidator::validate`] runs these steps in order, stopping at the
//! first failure:
//!
//! 1. Parse the query and resolve it against the schema
//! 2. Require at least one operation
//! 3. Require the first operation to be a query (read-only boundary)
//! 4. Enforce the depth ceiling
//! 5. Scan for paths into forbidden (secret) types
//!
//! Only the first operation of a document is validated. Every failure is
//! returned as a [`ValidationResult`], never as an error.

mod check;
pub mod depth;
mod result;

pub use result::{
    OperationKind, SECRET_REMEDIATION, ValidationResult, Violation, ViolationCode,
};

use std::sync::Arc;

use graphql_parser::query::{Definition, OperationDefinition, SelectionSet};

use crate::safety::{ForbiddenTypeSet, scan_selection_set};
use crate::schema::SchemaIndex;

/// Deepest selection nesting a query may have.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Stateless validator; cheap to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    forbidden: Arc<ForbiddenTypeSet>,
    max_depth: usize,
}

impl QueryValidator {
    pub fn new(forbidden: Arc<ForbiddenTypeSet>) -> Self {
        Self {
            forbidden,
            max_depth: MAX_QUERY_DEPTH,
        }
    }

    pub fn forbidden_types(&self) -> &ForbiddenTypeSet {
        &self.forbidden
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validate `query` against `index`.
    pub fn validate(&self, index: &SchemaIndex, query: &str) -> ValidationResult {
        match self.run(index, query) {
            Ok(result) => result,
            Err(violation) => ValidationResult::rejected(violation),
        }
    }

    fn run(&self, index: &SchemaIndex, query: &str) -> Result<ValidationResult, Violation> {
        let document = graphql_parser::parse_query::<String>(query)
            .map_err(|e| Violation::invalid(e.to_string()))?;

        check::check_document(index, &document)?;

        let operation = document
            .definitions
            .iter()
            .find_map(|d| match d {
                Definition::Operation(op) => Some(op),
                Definition::Fragment(_) => None,
            })
            .ok_or_else(|| Violation::invalid("no operations found"))?;

        let (kind, name, selection_set) = split_operation(operation);
        if kind != OperationKind::Query {
            return Err(Violation::operation_not_allowed(kind));
        }

        let depth = depth::selection_depth(selection_set);
        if depth > self.max_depth {
            return Err(Violation::depth_exceeded(depth, self.max_depth));
        }

        let root = index
            .query_type()
            .ok_or_else(|| Violation::invalid("Schema does not define a query type"))?;
        scan_selection_set(index, &self.forbidden, root, selection_set)?;

        Ok(ValidationResult::accepted(kind, name.cloned(), depth))
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(Arc::new(ForbiddenTypeSet::default()))
    }
}

fn split_operation<'o, 'a>(
    operation: &'o OperationDefinition<'a, String>,
) -> (
    OperationKind,
    Option<&'o String>,
    &'o SelectionSet<'a, String>,
) {
    match operation {
        OperationDefinition::SelectionSet(set) => (OperationKind::Query, None, set),
        OperationDefinition::Query(q) => (OperationKind::Query, q.name.as_ref(), &q.selection_set),
        OperationDefinition::Mutation(m) => {
            (OperationKind::Mutation, m.name.as_ref(), &m.selection_set)
        }
        OperationDefinition::Subscription(s) => (
            OperationKind::Subscription,
            s.name.as_ref(),
            &s.selection_set,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::remove_builtin_scalars;
    use crate::testing::SAMPLE_SCHEMA;

    fn index() -> SchemaIndex {
        SchemaIndex::parse(&remove_builtin_scalars(SAMPLE_SCHEMA)).unwrap()
    }

    fn validate(query: &str) -> ValidationResult {
        QueryValidator::default().validate(&index(), query)
    }

    fn rejected_with(query: &str, code: ViolationCode) -> String {
        let result = validate(query);
        assert!(!result.valid, "expected rejection for {query}");
        assert_eq!(result.code, Some(code), "{:?}", result.error_message);
        result.error_message.unwrap()
    }

    /// `team { applications { nodes { team { ... } } } }` repeated.
    fn nested_query(cycles: usize) -> String {
        let mut q = String::from("{ team(slug: \"x\") { ");
        for _ in 0..cycles {
            q.push_str("applications { nodes { team { ");
        }
        q.push_str("slug ");
        for _ in 0..(3 * cycles + 2) {
            q.push_str("} ");
        }
        q
    }

    #[test]
    fn test_accepts_simple_query() {
        let result = validate("query TeamInfo { team(slug: \"x\") { slug purpose } }");

        assert!(result.valid);
        assert_eq!(result.operation_type, Some(OperationKind::Query));
        assert_eq!(result.operation_name.as_deref(), Some("TeamInfo"));
        assert_eq!(result.depth, Some(1));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_depth_of_nested_connection() {
        let result = validate("{ team(slug: \"x\") { applications { nodes { name } } } }");
        assert!(result.valid, "{:?}", result.error_message);
        assert_eq!(result.depth, Some(3));
    }

    #[test]
    fn test_parse_error_is_a_result() {
        let message = rejected_with("{ team(slug: ", ViolationCode::QueryInvalid);
        assert!(!message.is_empty());
    }

    #[test]
    fn test_unknown_field() {
        let message = rejected_with("{ team(slug: \"x\") { nope } }", ViolationCode::QueryInvalid);
        assert!(message.contains("Cannot query field 'nope' on type 'Team'"));
    }

    #[test]
    fn test_unknown_and_missing_arguments() {
        let message = rejected_with("{ team(slug: \"x\", bogus: 1) { slug } }", ViolationCode::QueryInvalid);
        assert!(message.contains("Unknown argument 'bogus'"));

        let message = rejected_with("{ team { slug } }", ViolationCode::QueryInvalid);
        assert!(message.contains("argument 'slug'"));
        assert!(message.contains("is required"));
    }

    #[test]
    fn test_selection_shape() {
        let message = rejected_with("{ team(slug: \"x\") }", ViolationCode::QueryInvalid);
        assert!(message.contains("must have a selection of subfields"));

        let message = rejected_with("{ team(slug: \"x\") { slug { x } } }", ViolationCode::QueryInvalid);
        assert!(message.contains("has no subfields"));
    }

    #[test]
    fn test_typename_allowed_everywhere() {
        let result = validate("{ __typename search(query: \"a\") { __typename ... on Team { slug } } }");
        assert!(result.valid, "{:?}", result.error_message);
    }

    #[test]
    fn test_no_operations() {
        let message = rejected_with("fragment F on Team { slug }", ViolationCode::QueryInvalid);
        assert_eq!(message, "no operations found");
    }

    #[test]
    fn test_mutation_rejected() {
        let message = rejected_with(
            "mutation { deleteTeam(slug: \"x\") }",
            ViolationCode::OperationNotAllowed,
        );
        assert!(message.contains("only query operations are allowed"));
    }

    #[test]
    fn test_malformed_mutation_still_rejected_as_mutation() {
        let message = rejected_with("mutation { doesNotExist { x } }", ViolationCode::OperationNotAllowed);
        assert!(message.contains("only query operations are allowed"));
    }

    #[test]
    fn test_mutation_with_broken_fragment_rejected_as_mutation() {
        let message = rejected_with(
            "mutation { ...F } fragment F on Mutation { doesNotExist }",
            ViolationCode::OperationNotAllowed,
        );
        assert!(message.contains("only query operations are allowed"));

        rejected_with(
            "mutation { ...F } fragment F on Mutation { deleteTeam(slug: \"x\") } \
             fragment F on Mutation { deleteTeam(slug: \"y\") }",
            ViolationCode::OperationNotAllowed,
        );
    }

    #[test]
    fn test_subscription_rejected() {
        rejected_with("subscription { events { id } }", ViolationCode::OperationNotAllowed);
    }

    #[test]
    fn test_only_first_operation_counts() {
        let result = validate(
            "query A { team(slug: \"x\") { slug } } mutation B { deleteTeam(slug: \"x\") }",
        );
        assert!(result.valid);
        assert_eq!(result.operation_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_depth_at_limit_accepted() {
        // 1 + 3 * 4 = 13, then the leaf adds nothing
        let result = validate(&nested_query(4));
        assert!(result.valid, "{:?}", result.error_message);
        assert_eq!(result.depth, Some(13));
    }

    #[test]
    fn test_depth_exceeded() {
        let message = rejected_with(&nested_query(5), ViolationCode::DepthExceeded);
        assert!(message.contains("16"));
        assert!(message.contains("15"));
    }

    #[test]
    fn test_secret_field_rejected() {
        let message = rejected_with(
            "{ team(slug: \"x\") { secrets(first: 10) { nodes { id name } } } }",
            ViolationCode::SecretPolicyViolation,
        );
        assert!(message.contains("'secrets'"));
        assert!(message.contains("SecretConnection"));
        assert!(message.contains(SECRET_REMEDIATION));
    }

    #[test]
    fn test_secret_behind_list_wrapper() {
        let message = rejected_with(
            "{ team(slug: \"x\") { applications { nodes { secrets { name } } } } }",
            ViolationCode::SecretPolicyViolation,
        );
        assert!(message.contains("'Secret'"));
    }

    #[test]
    fn test_secret_inline_fragment_rejected() {
        let message = rejected_with(
            "{ node(id: \"1\") { id ... on Secret { name } } }",
            ViolationCode::SecretPolicyViolation,
        );
        assert!(message.contains("Secret"));
    }

    #[test]
    fn test_secret_named_fragment_rejected_by_name() {
        let message = rejected_with(
            "query { team(slug: \"x\") { ...SecretFields } } fragment SecretFields on Team { slug }",
            ViolationCode::SecretPolicyViolation,
        );
        assert!(message.contains("SecretFields"));
    }

    #[test]
    fn test_innocuous_fragment_name_is_not_resolved() {
        // Known gap: the spread is checked by name only.
        let result = validate(
            "query { team(slug: \"x\") { ...TeamBits } } \
             fragment TeamBits on Team { secrets { nodes { name } } }",
        );
        assert!(result.valid);
    }

    #[test]
    fn test_custom_forbidden_set() {
        let validator = QueryValidator::new(Arc::new(ForbiddenTypeSet::new(["TeamMember"])));
        let result = validator.validate(&index(), "{ team(slug: \"x\") { members { email } } }");
        assert_eq!(result.code, Some(ViolationCode::SecretPolicyViolation));
    }

    #[test]
    fn test_undefined_fragment() {
        let message = rejected_with("{ team(slug: \"x\") { ...Missing } }", ViolationCode::QueryInvalid);
        assert!(message.contains("Unknown fragment 'Missing'"));
    }
}
