//! Method signature parsing from PHP interface text.
//!
//! Lightweight pattern matching, not source parsing: the declaration is
//! located by regex and its parameter list is split on top-level commas so
//! defaults like `= [1, 2]` survive intact.

use regex::Regex;

use crate::api::catalog::EndpointParam;

/// Extract the parameters of `function <method_name>(...)` from interface
/// text. Returns an empty list when the method is not found or declares no
/// parameters.
///
/// Per parameter: optional leading type token, required `$name`, optional
/// `= default`. A parameter is optional iff it carries a default; a missing
/// type resolves to "mixed".
pub fn parse_method_params(interface_text: &str, method_name: &str) -> Vec<EndpointParam> {
    let method_re = Regex::new(&format!(
        r"function\s+{}\s*\(([^)]*)\)",
        regex::escape(method_name)
    ))
    .expect("valid regex");

    let Some(found) = method_re.captures(interface_text) else {
        return Vec::new();
    };
    let raw_list = found[1].trim().to_string();
    if raw_list.is_empty() {
        return Vec::new();
    }

    let param_re = Regex::new(
        r"^(?:([a-zA-Z_\\?][a-zA-Z0-9_\\]*)\s+)?\$([a-zA-Z_][a-zA-Z0-9_]*)(?:\s*=\s*(.+))?$",
    )
    .expect("valid regex");

    let mut params = Vec::new();
    for token in split_top_level(&raw_list) {
        let Some(caps) = param_re.captures(token.trim()) else {
            continue;
        };
        let param_type = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "mixed".to_string());
        let name = caps[2].to_string();
        let default_value = caps.get(3).map(|m| m.as_str().trim().to_string());
        params.push(EndpointParam {
            name,
            optional: default_value.is_some(),
            param_type,
            default_value,
        });
    }
    params
}

/// Split on commas at bracket depth zero and outside string literals.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (index, ch) in list.char_indices() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&list[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&list[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface_fixture() -> &'static str {
        r#"<?php
namespace Foo\Bar\Api;

interface TestInterface
{
    /**
     * @return \Foo\Bar\Api\Data\TestInterface
     */
    public function getById(string $id, int $size = 10);

    public function save(\Foo\Bar\Api\Data\TestInterface $entity);

    public function search($query, array $filters = ['a', 'b'], int $limit = 20);

    public function ping();
}
"#
    }

    #[test]
    fn test_parse_typed_and_defaulted_params() {
        let params = parse_method_params(interface_fixture(), "getById");
        assert_eq!(params.len(), 2);

        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].param_type, "string");
        assert!(!params[0].optional);
        assert_eq!(params[0].default_value, None);

        assert_eq!(params[1].name, "size");
        assert_eq!(params[1].param_type, "int");
        assert!(params[1].optional);
        assert_eq!(params[1].default_value.as_deref(), Some("10"));
    }

    #[test]
    fn test_parse_namespaced_type() {
        let params = parse_method_params(interface_fixture(), "save");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].param_type, r"\Foo\Bar\Api\Data\TestInterface");
        assert_eq!(params[0].name, "entity");
    }

    #[test]
    fn test_parse_untyped_param_is_mixed() {
        let params = parse_method_params(interface_fixture(), "search");
        assert_eq!(params[0].name, "query");
        assert_eq!(params[0].param_type, "mixed");
        assert!(!params[0].optional);
    }

    #[test]
    fn test_default_with_comma_stays_whole() {
        let params = parse_method_params(interface_fixture(), "search");
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].name, "filters");
        assert_eq!(params[1].default_value.as_deref(), Some("['a', 'b']"));
        assert_eq!(params[2].name, "limit");
        assert_eq!(params[2].default_value.as_deref(), Some("20"));
    }

    #[test]
    fn test_no_params_and_missing_method() {
        assert!(parse_method_params(interface_fixture(), "ping").is_empty());
        assert!(parse_method_params(interface_fixture(), "doesNotExist").is_empty());
        assert!(parse_method_params("", "getById").is_empty());
    }

    #[test]
    fn test_split_top_level_respects_quotes() {
        let parts = split_top_level(r#"string $sep = 'a,b', int $n = 1"#);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].trim(), "string $sep = 'a,b'");
        assert_eq!(parts[1].trim(), "int $n = 1");
    }
}
