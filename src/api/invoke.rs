//! Endpoint invocation: path templating, the query/body split, and curl argv
//! assembly executed through the remote channel.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::Value;

use crate::api::auth;
use crate::api::catalog;
use crate::exec::policy;
use crate::exec::RemoteChannel;

/// Everything except ASCII alphanumerics and `- _ . ! ~ * ' ( )` gets
/// percent-escaped in path segments and catalog query components.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Form encoding keeps `* - . _` and turns spaces into `+`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// URL-encode one path or query component.
pub fn encode_component(text: &str) -> String {
    percent_encode(text.as_bytes(), COMPONENT).to_string()
}

fn form_encode(text: &str) -> String {
    // %20 below can only come from an actual space: hex digits are never
    // escaped, so no other escape sequence contains it
    percent_encode(text.as_bytes(), FORM)
        .to_string()
        .replace("%20", "+")
}

/// application/x-www-form-urlencoded query string from a string map.
pub fn form_query_string(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// JSON scalars as query/path text: strings bare, everything else in its
/// JSON form.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Replace every `:name` token with the URL-encoded string form of
/// `params[name]`, or the empty string for null and absent values. Returns
/// the rendered path and the set of substituted names.
pub fn render_path(
    template: &str,
    params: &serde_json::Map<String, Value>,
) -> (String, HashSet<String>) {
    let token_re = Regex::new(r":([a-zA-Z_][a-zA-Z0-9_]*)").expect("valid regex");
    let mut used = HashSet::new();
    let rendered = token_re.replace_all(template, |caps: &regex::Captures| {
        let name = caps[1].to_string();
        let replacement = match params.get(&name) {
            None | Some(Value::Null) => String::new(),
            Some(value) => encode_component(&scalar_string(value)),
        };
        used.insert(name);
        replacement
    });
    (rendered.into_owned(), used)
}

/// GET query string from the parameters left over after path templating.
///
/// Arrays serialize as repeated `key[]=value` pairs, objects as one
/// JSON-encoded value, scalars directly; nulls are skipped.
pub fn query_string(remaining: &serde_json::Map<String, Value>) -> String {
    let mut parts = Vec::new();
    for (key, value) in remaining {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let array_key = encode_component(&format!("{}[]", key));
                for item in items {
                    parts.push(format!("{}={}", array_key, encode_component(&scalar_string(item))));
                }
            }
            Value::Object(_) => {
                parts.push(format!(
                    "{}={}",
                    encode_component(key),
                    encode_component(&value.to_string())
                ));
            }
            scalar => {
                parts.push(format!(
                    "{}={}",
                    encode_component(key),
                    encode_component(&scalar_string(scalar))
                ));
            }
        }
    }
    parts.join("&")
}

/// One catalog invocation request.
pub struct TryRequest {
    pub id: String,
    pub params: serde_json::Map<String, Value>,
    pub authenticate: bool,
    /// Host-side punchin XML content, shipped inline to the container.
    pub punchin_xml: Option<String>,
    pub reuse_session: bool,
    pub method_override: Option<String>,
}

/// Outcome of a catalog invocation.
#[derive(Debug)]
pub enum TryOutcome {
    /// No endpoint with the requested id in the current catalog.
    NotFound,
    /// The request went out; body carries combined stdout/stderr on failure.
    Called {
        method: String,
        path: String,
        body: String,
    },
}

/// Look the endpoint up in a freshly discovered catalog and issue the call.
///
/// Parameters consumed by path templating never reappear in the query or
/// body. GET requests carry the leftovers as a query string; everything else
/// sends them as a JSON body. The request itself is curl through the channel
/// against the in-container nginx with the project Host header.
pub async fn try_endpoint(
    channel: Arc<dyn RemoteChannel>,
    service: &str,
    parallelism: usize,
    base_url: &str,
    host_header: &str,
    request: TryRequest,
) -> TryOutcome {
    let endpoints = catalog::discover_endpoints(channel.clone(), service, parallelism).await;
    let Some(endpoint) = endpoints.iter().find(|e| e.id == request.id) else {
        return TryOutcome::NotFound;
    };

    let (path, used) = render_path(&endpoint.path_template, &request.params);
    let method = request
        .method_override
        .unwrap_or_else(|| endpoint.http_method.clone());

    let mut curl: Vec<String> = vec![
        "curl".to_string(),
        "-s".to_string(),
        "-k".to_string(),
        "-H".to_string(),
        format!("Host: {}", host_header),
    ];
    if method != "GET" {
        curl.push("-X".to_string());
        curl.push(method.clone());
    }
    curl.push("-H".to_string());
    curl.push("Accept: application/json".to_string());

    if request.authenticate {
        let jar = request
            .reuse_session
            .then(|| auth::reusable_jar_path(host_header));
        let cookie_args = auth::punchin_cookie_args(
            &*channel,
            service,
            base_url,
            host_header,
            request.punchin_xml.as_deref(),
            jar.as_deref(),
        )
        .await;
        curl.extend(cookie_args);
    }

    let remaining: serde_json::Map<String, Value> = request
        .params
        .iter()
        .filter(|(key, _)| !used.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut query = String::new();
    if method == "GET" {
        let qs = query_string(&remaining);
        if !qs.is_empty() {
            query = format!("?{}", qs);
        }
    } else {
        curl.push("-H".to_string());
        curl.push("Content-Type: application/json".to_string());
        curl.push("-d".to_string());
        curl.push(Value::Object(remaining).to_string());
    }
    curl.push(format!("{}{}{}", base_url, path, query));

    let response = channel.execute(service, &curl, policy::DEFAULT_TIMEOUT).await;
    let body = if response.success {
        response.stdout
    } else {
        format!("{}\n{}", response.stdout, response.stderr)
    };

    TryOutcome::Called {
        method,
        path,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn test_encode_component_matches_unreserved_set() {
        assert_eq!(encode_component("abc-XYZ_0.9!~*'()"), "abc-XYZ_0.9!~*'()");
        assert_eq!(encode_component("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_component("sku#1&2"), "sku%231%262");
    }

    #[test]
    fn test_form_encoding_uses_plus_for_spaces() {
        let query: BTreeMap<String, String> = [
            ("searchCriteria".to_string(), "a b".to_string()),
            ("flag".to_string(), "1*".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(form_query_string(&query), "flag=1*&searchCriteria=a+b");
    }

    #[test]
    fn test_render_path_substitutes_and_encodes() {
        let map = params(json!({"id": "A/1", "size": 3}));
        let (path, used) = render_path("/V1/test/:id", &map);
        assert_eq!(path, "/V1/test/A%2F1");
        assert!(used.contains("id"));
        assert!(!used.contains("size"));
    }

    #[test]
    fn test_render_path_missing_and_null_become_empty() {
        let map = params(json!({"b": null}));
        let (path, used) = render_path("/V1/x/:a/y/:b", &map);
        assert_eq!(path, "/V1/x//y/");
        assert!(used.contains("a"));
        assert!(used.contains("b"));
    }

    #[test]
    fn test_render_path_numeric_value() {
        let map = params(json!({"id": 42}));
        let (path, _) = render_path("/V1/test/:id", &map);
        assert_eq!(path, "/V1/test/42");
    }

    #[test]
    fn test_query_string_shapes() {
        let map = params(json!({
            "skus": ["a-1", "b 2"],
            "filter": {"field": "name"},
            "page": 2,
            "flag": true,
            "skip": null
        }));
        let qs = query_string(&map);
        // serde_json maps iterate in key order
        assert_eq!(
            qs,
            "filter=%7B%22field%22%3A%22name%22%7D&flag=true&page=2&skus%5B%5D=a-1&skus%5B%5D=b%202"
        );
    }

    #[test]
    fn test_query_string_empty() {
        assert_eq!(query_string(&serde_json::Map::new()), "");
    }
}
