//! Repair pass applied to fetched SDL before parsing.
//!
//! Upstream SDL dumps re-declare the built-in scalars (`scalar String`, ...),
//! which clashes with the parser's own built-in definitions. The declarations
//! are dropped together with the description directly above them.

/// Scalars every GraphQL implementation provides.
pub const BUILTIN_SCALARS: [&str; 5] = ["Boolean", "String", "Int", "Float", "ID"];

const BLOCK_QUOTE: &str = "\"\"\"";

/// Strip built-in scalar declarations (and their descriptions) from `sdl`.
///
/// Works line by line. A description (triple-quoted or a one-line string)
/// is held back until the declaration after it is seen: if that declaration is a built-in scalar
/// both are dropped, otherwise both are emitted unchanged.
pub fn remove_builtin_scalars(sdl: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut in_description = false;

    for line in sdl.split('\n') {
        let trimmed = line.trim();

        if in_description {
            pending.push(line);
            if trimmed.ends_with(BLOCK_QUOTE) {
                in_description = false;
            }
            continue;
        }

        if trimmed.starts_with(BLOCK_QUOTE) {
            // Anything still pending was a description with no declaration
            // after it; keep it.
            out.append(&mut pending);
            pending.push(line);
            let closed_on_same_line =
                trimmed.len() >= 2 * BLOCK_QUOTE.len() && trimmed.ends_with(BLOCK_QUOTE);
            in_description = !closed_on_same_line;
            continue;
        }

        if is_string_description(trimmed) {
            out.append(&mut pending);
            pending.push(line);
            continue;
        }

        if is_builtin_scalar_declaration(trimmed) {
            pending.clear();
            continue;
        }

        out.append(&mut pending);
        out.push(line);
    }

    out.append(&mut pending);
    out.join("\n")
}

/// A one-line `"..."` description.
fn is_string_description(trimmed: &str) -> bool {
    !trimmed.starts_with(BLOCK_QUOTE)
        && trimmed.len() >= 2
        && trimmed.starts_with('"')
        && trimmed.ends_with('"')
}

/// `scalar String`, `scalar ID @specifiedBy(...)`, ... but not `scalar Date`.
fn is_builtin_scalar_declaration(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("scalar") else {
        return false;
    };
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }
    let name = rest
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '@')
        .next()
        .unwrap_or_default();
    BUILTIN_SCALARS.contains(&name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DUMP: &str = r#""""
The `Boolean` scalar type represents `true` or `false`.
"""
scalar Boolean

"""
The `String` scalar type represents textual data.
"""
scalar String

"""The `Int` scalar type."""
scalar Int

"""
The `Float` scalar type.
"""
scalar Float

"""
The `ID` scalar type.
"""
scalar ID

"""
A calendar date.
"""
scalar Date

type Query {
  "The team"
  team(slug: String!): Team
  count: Int
}
"#;

    #[test]
    fn test_removes_builtin_scalars_and_descriptions() {
        let repaired = remove_builtin_scalars(DUMP);

        for name in BUILTIN_SCALARS {
            assert!(
                !repaired.contains(&format!("scalar {name}")),
                "scalar {name} survived:\n{repaired}"
            );
        }
        assert!(!repaired.contains("represents `true` or `false`"));
        assert!(!repaired.contains("textual data"));
        assert!(!repaired.contains("The `Int` scalar type."));
        assert!(!repaired.contains("The `ID` scalar type."));
    }

    #[test]
    fn test_keeps_custom_scalar_and_types_verbatim() {
        let repaired = remove_builtin_scalars(DUMP);

        assert!(repaired.contains("\"\"\"\nA calendar date.\n\"\"\"\nscalar Date"));
        assert!(repaired.contains(
            "type Query {\n  \"The team\"\n  team(slug: String!): Team\n  count: Int\n}"
        ));
    }

    #[test]
    fn test_field_types_named_like_scalars_are_kept() {
        let sdl = "type User {\n  id: ID!\n  name: String\n}\n";
        assert_eq!(remove_builtin_scalars(sdl), sdl);
    }

    #[test]
    fn test_scalar_with_directive() {
        let sdl = "scalar ID @specifiedBy(url: \"x\")\nscalar IDentifier\n";
        assert_eq!(remove_builtin_scalars(sdl), "scalar IDentifier\n");
    }

    #[test]
    fn test_no_builtins_is_identity() {
        let sdl = "\"\"\"\nDoc\n\"\"\"\ntype A {\n  b: Int\n}";
        assert_eq!(remove_builtin_scalars(sdl), sdl);
    }

    #[test]
    fn test_string_description_dropped_with_scalar() {
        let sdl = "type Query {\n  \"Name\"\n  name: String\n}\n\"UTF-8 text\"\nscalar String";
        let repaired = remove_builtin_scalars(sdl);

        assert_eq!(repaired, "type Query {\n  \"Name\"\n  name: String\n}");
        assert!(graphql_parser::parse_schema::<String>(&repaired).is_ok());
    }
}
