//! API tools: catalog browsing (`api_docs`, `api_docs_endpoint`), catalog
//! invocation (`api_try`), and the free-form call and schema-discovery tools
//! that hit the external vhost.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::auth;
use crate::api::catalog::{discover_endpoints, Endpoint};
use crate::api::invoke::{self, TryOutcome, TryRequest};
use crate::exec::policy;
use crate::project;
use crate::tools::{ToolContext, ToolId, ToolSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocsFormat {
    Summary,
    EndpointsOnly,
    Json,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverType {
    Rest,
    Graphql,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverFormat {
    Summary,
    Detailed,
    EndpointsOnly,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocsArgs {
    pub format: DocsFormat,
    pub limit: u32,
    pub offset: u32,
    /// Substring match on the module name.
    pub module_filter: Option<String>,
    /// Prefix match on the path template.
    pub prefix_filter: Option<String>,
}

impl Default for DocsArgs {
    fn default() -> Self {
        DocsArgs {
            format: DocsFormat::Summary,
            limit: 50,
            offset: 0,
            module_filter: None,
            prefix_filter: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsEndpointArgs {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryArgs {
    pub id: String,
    #[serde(default)]
    pub params: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub authenticate: Option<bool>,
    #[serde(default)]
    pub punchin_xml_path: Option<String>,
    #[serde(default)]
    pub authenticate_reuse: Option<bool>,
    #[serde(default)]
    pub method_override: Option<HttpMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgs {
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub graphql_query: Option<String>,
    #[serde(default)]
    pub authenticate: Option<bool>,
    #[serde(default)]
    pub punchin_xml_path: Option<String>,
    #[serde(default)]
    pub authenticate_reuse: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverArgs {
    #[serde(rename = "type")]
    pub api_type: DiscoverType,
    pub format: DiscoverFormat,
    pub authenticate: Option<bool>,
    pub punchin_xml_path: Option<String>,
    pub authenticate_reuse: Option<bool>,
}

impl Default for DiscoverArgs {
    fn default() -> Self {
        DiscoverArgs {
            api_type: DiscoverType::Both,
            format: DiscoverFormat::Summary,
            authenticate: None,
            punchin_xml_path: None,
            authenticate_reuse: None,
        }
    }
}

/// Host-side punchin XML content: the per-call path wins over the configured
/// default; unreadable files degrade to None and the handshake falls back to
/// the in-container /tmp/punchin.xml.
fn load_punchin_xml(
    context: &ToolContext,
    per_call_path: Option<&str>,
    authenticate: bool,
) -> Option<String> {
    if !authenticate {
        return None;
    }
    let path = per_call_path
        .map(PathBuf::from)
        .or_else(|| context.punchin_xml_path.clone())?;
    std::fs::read_to_string(path).ok()
}

async fn filtered_catalog(context: &ToolContext, args: &DocsArgs) -> Vec<Endpoint> {
    let mut endpoints = discover_endpoints(
        context.channel.clone(),
        &context.php_service,
        context.discovery_parallelism,
    )
    .await;
    if let Some(module) = &args.module_filter {
        endpoints.retain(|e| e.module_name.contains(module.as_str()));
    }
    if let Some(prefix) = &args.prefix_filter {
        endpoints.retain(|e| e.path_template.starts_with(prefix.as_str()));
    }
    endpoints
}

pub async fn api_docs(context: &ToolContext, args: DocsArgs) -> String {
    let endpoints = filtered_catalog(context, &args).await;
    let badge = context.badge();
    let total = endpoints.len();

    if args.format == DocsFormat::Json {
        let payload = json!({
            "project": badge,
            "total": total,
            "endpoints": endpoints,
        });
        return serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string());
    }

    let mut by_module: BTreeMap<&str, usize> = BTreeMap::new();
    for endpoint in &endpoints {
        *by_module.entry(endpoint.module_name.as_str()).or_default() += 1;
    }

    let mut lines = vec![format!("{} API Catalog", badge)];
    lines.push(format!("\nTotal endpoints: {}", total));
    lines.push(format!("Modules: {}", by_module.len()));
    for (module, count) in &by_module {
        lines.push(format!("  {}: {}", module, count));
    }

    if args.format == DocsFormat::EndpointsOnly {
        let offset = args.offset as usize;
        let limit = args.limit.clamp(1, 200) as usize;
        let page: Vec<&Endpoint> = endpoints.iter().skip(offset).take(limit).collect();
        lines.push(format!(
            "\nEndpoints {}-{} of {}",
            offset + 1,
            offset + page.len(),
            total
        ));
        for endpoint in &page {
            lines.push(format!(
                "  {} {} ({})",
                endpoint.http_method, endpoint.path_template, endpoint.auth_resource
            ));
        }
        let shown = offset + page.len();
        if shown < total {
            lines.push(format!("  ... {} more (use offset/limit)", total - shown));
        }
    }

    lines.join("\n")
}

pub async fn api_docs_endpoint(context: &ToolContext, args: DocsEndpointArgs) -> String {
    let endpoints = discover_endpoints(
        context.channel.clone(),
        &context.php_service,
        context.discovery_parallelism,
    )
    .await;
    let badge = context.badge();

    let Some(endpoint) = endpoints.iter().find(|e| e.id == args.id) else {
        return format!("{} Endpoint not found: {}", badge, args.id);
    };

    let mut lines = vec![
        format!("{} Endpoint", badge),
        format!("ID: {}", endpoint.id),
        format!("Method: {}", endpoint.http_method),
        format!("Path: {}", endpoint.path_template),
        format!("Auth: {}", endpoint.auth_resource),
        format!("Service: {}::{}", endpoint.service_class, endpoint.service_method),
        format!("Module: {}", endpoint.module_name),
    ];

    if endpoint.params.is_empty() {
        lines.push("\nParams: (none)".to_string());
    } else {
        lines.push("\nParams:".to_string());
        for param in &endpoint.params {
            let mut line = format!("  - {}: {}", param.name, param.param_type);
            if param.optional {
                line.push_str(" (optional)");
            }
            if let Some(default) = &param.default_value {
                line.push_str(&format!(" = {}", default));
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}

pub async fn api_try(context: &ToolContext, args: TryArgs) -> String {
    let badge = context.badge();
    let env = context.dot_env();
    let host = project::container_host(&env);
    let authenticate = args.authenticate.unwrap_or(false);
    let punchin_xml = load_punchin_xml(context, args.punchin_xml_path.as_deref(), authenticate);

    let request = TryRequest {
        id: args.id.clone(),
        params: args.params.unwrap_or_default(),
        authenticate,
        punchin_xml,
        reuse_session: args.authenticate_reuse.unwrap_or(false),
        method_override: args.method_override.map(|m| m.as_str().to_string()),
    };

    let outcome = invoke::try_endpoint(
        context.channel.clone(),
        &context.php_service,
        context.discovery_parallelism,
        project::CONTAINER_BASE_URL,
        &host,
        request,
    )
    .await;

    match outcome {
        TryOutcome::NotFound => {
            format!("{} apiTry\n\nUnknown endpoint id: {}", badge, args.id)
        }
        TryOutcome::Called { method, path, body } => {
            let trimmed = body.trim();
            let shown = if trimmed.is_empty() { "(empty)" } else { trimmed };
            format!("{} apiTry {} {}\n\n{}", badge, method, path, shown)
        }
    }
}

async fn external_cookie_args(
    context: &ToolContext,
    base_url: &str,
    host: &str,
    authenticate: bool,
    punchin_xml_path: Option<&str>,
    reuse: bool,
) -> Vec<String> {
    if !authenticate {
        return Vec::new();
    }
    let punchin_xml = load_punchin_xml(context, punchin_xml_path, authenticate);
    let jar = reuse.then(|| auth::reusable_jar_path(host));
    auth::punchin_cookie_args(
        context.channel.as_ref(),
        &context.php_service,
        base_url,
        host,
        punchin_xml.as_deref(),
        jar.as_deref(),
    )
    .await
}

/// Free-form HTTP call against the external vhost, for endpoints the catalog
/// doesn't describe (GraphQL, custom frontcontrollers, redirects).
pub async fn api_call(context: &ToolContext, args: CallArgs) -> String {
    let badge = context.badge();
    let env = context.dot_env();
    let (host, base) = project::external_host(&env);
    let method = args.method.as_str();

    let cookie_args = external_cookie_args(
        context,
        &base,
        &host,
        args.authenticate.unwrap_or(false),
        args.punchin_xml_path.as_deref(),
        args.authenticate_reuse.unwrap_or(false),
    )
    .await;

    let mut curl: Vec<String> = vec![
        "curl".to_string(),
        "-s".to_string(),
        "-L".to_string(),
        "-X".to_string(),
        method.to_string(),
    ];
    curl.extend(cookie_args);
    for (key, value) in &args.headers {
        curl.push("-H".to_string());
        curl.push(format!("{}: {}", key, value));
    }
    curl.push("-H".to_string());
    curl.push(format!("Host: {}", host));

    if args.path == "graphql" {
        if let Some(graphql_query) = &args.graphql_query {
            curl.push("-H".to_string());
            curl.push("Content-Type: application/json".to_string());
            curl.push("--data-raw".to_string());
            curl.push(json!({ "query": graphql_query }).to_string());
        }
    } else if let Some(body) = &args.body {
        if matches!(
            args.method,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
        ) {
            curl.push("-H".to_string());
            curl.push("Content-Type: application/json".to_string());
            curl.push("--data-raw".to_string());
            curl.push(Value::Object(body.clone()).to_string());
        }
    }

    let mut full_path = args.path.clone();
    let query = invoke::form_query_string(&args.query);
    if !query.is_empty() {
        full_path.push('?');
        full_path.push_str(&query);
    }
    curl.push(format!("{}{}", base, full_path));

    let result = context
        .channel
        .execute(&context.php_service, &curl, policy::DEFAULT_TIMEOUT)
        .await;
    let response = if result.success {
        result.stdout
    } else {
        format!("Error: {}", result.stderr)
    };

    format!(
        "{} API Call\n\nRequest: {} {}\n\nResponse:\n{}",
        badge, method, full_path, response
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Probe the published REST schema and GraphQL introspection on the external
/// vhost. Only reachability and an optional payload peek; the catalog tools
/// are the real browsing surface.
pub async fn api_discover(context: &ToolContext, args: DiscoverArgs) -> String {
    let badge = context.badge();
    let env = context.dot_env();
    let (host, base) = project::external_host(&env);

    let cookie_args = external_cookie_args(
        context,
        &base,
        &host,
        args.authenticate.unwrap_or(false),
        args.punchin_xml_path.as_deref(),
        args.authenticate_reuse.unwrap_or(false),
    )
    .await;

    let mut results: Vec<String> = Vec::new();

    if matches!(args.api_type, DiscoverType::Rest | DiscoverType::Both) {
        let mut curl: Vec<String> = vec!["curl".to_string(), "-s".to_string(), "-L".to_string()];
        curl.extend(cookie_args.clone());
        curl.push("-H".to_string());
        curl.push(format!("Host: {}", host));
        curl.push(format!("{}/rest/default/schema", base));

        let result = context
            .channel
            .execute(&context.php_service, &curl, policy::DEFAULT_TIMEOUT)
            .await;
        if result.success {
            results.push("REST API Schema discovered".to_string());
            if args.format == DiscoverFormat::Detailed {
                results.push(format!("{}...", truncate_chars(&result.stdout, 1000)));
            }
        }
    }

    if matches!(args.api_type, DiscoverType::Graphql | DiscoverType::Both) {
        let introspection =
            "query IntrospectionQuery { __schema { types { name kind description } } }";
        let mut curl: Vec<String> = vec!["curl".to_string(), "-s".to_string(), "-L".to_string()];
        curl.extend(cookie_args.clone());
        curl.push("-H".to_string());
        curl.push(format!("Host: {}", host));
        curl.push("-H".to_string());
        curl.push("Content-Type: application/json".to_string());
        curl.push("--data-raw".to_string());
        curl.push(json!({ "query": introspection }).to_string());
        curl.push(format!("{}/graphql", base));

        let result = context
            .channel
            .execute(&context.php_service, &curl, policy::DEFAULT_TIMEOUT)
            .await;
        if result.success {
            results.push("GraphQL Schema discovered".to_string());
            if args.format == DiscoverFormat::Detailed {
                results.push(format!("{}...", truncate_chars(&result.stdout, 1000)));
            }
        }
    }

    format!("{} API Discovery\n\n{}", badge, results.join("\n\n"))
}

pub fn specs() -> Vec<ToolSpec> {
    let auth_properties = json!({
        "authenticate": {
            "type": "boolean",
            "description": "Run the punchin cookie handshake before the call"
        },
        "punchinXmlPath": {
            "type": "string",
            "description": "Host-side path to punchin XML credentials"
        },
        "authenticateReuse": {
            "type": "boolean",
            "description": "Reuse the per-host cookie jar across calls"
        }
    });
    let auth_props = auth_properties.as_object().cloned().unwrap_or_default();

    let mut try_props = json!({
        "id": {
            "type": "string",
            "description": "Endpoint id from magento_api_docs (serviceClass.serviceMethod)"
        },
        "params": {
            "type": "object",
            "description": "Named parameters; path tokens first, leftovers go to query or body"
        },
        "methodOverride": {
            "type": "string",
            "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"],
            "description": "Override the catalog HTTP method"
        }
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    try_props.extend(auth_props.clone());

    let mut call_props = json!({
        "method": {
            "type": "string",
            "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"],
            "description": "HTTP method [default: GET]"
        },
        "path": {
            "type": "string",
            "description": "Path relative to the base URL, e.g. /rest/V1/products; 'graphql' plus graphqlQuery sends a GraphQL request"
        },
        "query": {
            "type": "object",
            "additionalProperties": {"type": "string"},
            "description": "Query string parameters"
        },
        "headers": {
            "type": "object",
            "additionalProperties": {"type": "string"},
            "description": "Extra request headers"
        },
        "body": {
            "type": "object",
            "description": "JSON body for POST/PUT/PATCH"
        },
        "graphqlQuery": {
            "type": "string",
            "description": "GraphQL query document, used when path is 'graphql'"
        }
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    call_props.extend(auth_props.clone());

    let mut discover_props = json!({
        "type": {
            "type": "string",
            "enum": ["rest", "graphql", "both"],
            "description": "Which API surface to probe [default: both]"
        },
        "format": {
            "type": "string",
            "enum": ["summary", "detailed", "endpoints-only"],
            "description": "detailed includes the first kilobyte of each schema"
        }
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    discover_props.extend(auth_props);

    vec![
        ToolSpec {
            id: ToolId::ApiDocs,
            name: "magento_api_docs",
            description: "Browse the REST endpoint catalog discovered from webapi.xml",
            schema: json!({
                "type": "object",
                "properties": {
                    "format": {
                        "type": "string",
                        "enum": ["summary", "endpoints-only", "json"],
                        "description": "summary lists modules, endpoints-only adds a paged endpoint list, json dumps the catalog"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 200,
                        "description": "Page size for endpoints-only [default: 50]"
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Page offset for endpoints-only"
                    },
                    "moduleFilter": {
                        "type": "string",
                        "description": "Keep endpoints whose module contains this string"
                    },
                    "prefixFilter": {
                        "type": "string",
                        "description": "Keep endpoints whose path starts with this prefix"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::ApiDocsEndpoint,
            name: "magento_api_docs_endpoint",
            description: "Show one catalog endpoint in full, including parameters",
            schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Endpoint id (serviceClass.serviceMethod)"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolSpec {
            id: ToolId::ApiTry,
            name: "magento_api_try",
            description: "Call a catalog endpoint by id with named parameters",
            schema: json!({
                "type": "object",
                "properties": Value::Object(try_props),
                "required": ["id"]
            }),
        },
        ToolSpec {
            id: ToolId::ApiCall,
            name: "magento_api_call",
            description: "Free-form HTTP call against the project's web APIs",
            schema: json!({
                "type": "object",
                "properties": Value::Object(call_props),
                "required": ["path"]
            }),
        },
        ToolSpec {
            id: ToolId::ApiDiscover,
            name: "magento_api_discover",
            description: "Probe the published REST schema and GraphQL introspection",
            schema: json!({
                "type": "object",
                "properties": Value::Object(discover_props)
            }),
        },
    ]
}
