//! Endpoint catalog, discovered fresh from the remote filesystem on every
//! request. Staleness is worse than latency here: modules come and go as
//! developers work, so nothing is cached between calls.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::api::routes::{self, RouteBlock};
use crate::api::signature;
use crate::exec::policy;
use crate::exec::RemoteChannel;

/// One parameter of a callable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// One callable endpoint, assembled from a route block and the signature of
/// its declaring interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// `<service_class>.<service_method>`, unique within a discovery pass.
    pub id: String,
    pub path_template: String,
    pub http_method: String,
    pub auth_resource: String,
    pub service_class: String,
    pub service_method: String,
    pub module_name: String,
    pub params: Vec<EndpointParam>,
}

/// Discover the endpoint catalog.
///
/// One round trip finds the route files; each file then costs one fetch for
/// the XML plus one per route block for the declaring interface. File tasks
/// run concurrently under a semaphore so big installations don't serialize,
/// and the final sort by (path_template, http_method) makes the ordering
/// independent of completion order. Unreadable files and blocks without a
/// service declaration are skipped, never fatal.
pub async fn discover_endpoints(
    channel: Arc<dyn RemoteChannel>,
    service: &str,
    parallelism: usize,
) -> Vec<Endpoint> {
    let find_argv = argv(&["find", "app/code", "-name", "webapi.xml", "-type", "f"]);
    let found = channel
        .execute(service, &find_argv, policy::DEFAULT_TIMEOUT)
        .await;
    if !found.success {
        tracing::debug!(stderr = %found.stderr.trim(), "route file search failed");
        return Vec::new();
    }

    let files: Vec<String> = found
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let limiter = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks = Vec::with_capacity(files.len());
    for file in files {
        let channel = channel.clone();
        let service = service.to_string();
        let limiter = limiter.clone();
        tasks.push(tokio::spawn(async move {
            let Ok(_permit) = limiter.acquire_owned().await else {
                return Vec::new();
            };
            discover_file(channel, &service, &file).await
        }));
    }

    let mut endpoints = Vec::new();
    for task in join_all(tasks).await {
        if let Ok(mut file_endpoints) = task {
            endpoints.append(&mut file_endpoints);
        }
    }

    endpoints.sort_by(|a, b| {
        a.path_template
            .cmp(&b.path_template)
            .then_with(|| a.http_method.cmp(&b.http_method))
    });
    endpoints
}

async fn discover_file(
    channel: Arc<dyn RemoteChannel>,
    service: &str,
    file: &str,
) -> Vec<Endpoint> {
    // tr strips carriage returns so the regexes see clean line endings
    let fetch = shell_argv(&format!("cat {} | tr -d \"\\r\"", file));
    let fetched = channel.execute(service, &fetch, policy::DEFAULT_TIMEOUT).await;
    if !fetched.success {
        tracing::debug!(file = %file, "skipping unreadable route file");
        return Vec::new();
    }

    let mut endpoints = Vec::new();
    for block in routes::extract_routes(&fetched.stdout) {
        endpoints.push(resolve_endpoint(&*channel, service, block).await);
    }
    endpoints
}

async fn resolve_endpoint(
    channel: &dyn RemoteChannel,
    service: &str,
    block: RouteBlock,
) -> Endpoint {
    let interface_path = format!("app/code/{}.php", block.service_class.replace('\\', "/"));
    // `|| true` keeps a missing interface from reading as a fetch failure
    let fetch = shell_argv(&format!(
        "test -f {path} && cat {path} | tr -d \"\\r\" || true",
        path = interface_path
    ));
    let fetched = channel.execute(service, &fetch, policy::DEFAULT_TIMEOUT).await;

    let params = if fetched.success && !fetched.stdout.trim().is_empty() {
        signature::parse_method_params(&fetched.stdout, &block.service_method)
    } else {
        Vec::new()
    };

    Endpoint {
        id: format!("{}.{}", block.service_class, block.service_method),
        module_name: routes::module_name(&block.service_class),
        path_template: block.path_template,
        http_method: block.http_method,
        auth_resource: block.auth_resource,
        service_class: block.service_class,
        service_method: block.service_method,
        params,
    }
}

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `bash -lc <script>` argv for remote text fetches.
fn shell_argv(script: &str) -> Vec<String> {
    vec!["bash".to_string(), "-lc".to_string(), script.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{err_result, ok_result, ScriptedChannel};

    const WEBAPI_XML: &str = r#"<?xml version="1.0"?>
<routes>
    <route url="/V1/test/:id" method="GET">
        <service class="Foo\Bar\Api\TestInterface" method="getById"/>
        <resources>
            <resource ref="anonymous"/>
        </resources>
    </route>
</routes>
"#;

    const INTERFACE_PHP: &str = r#"<?php
namespace Foo\Bar\Api;

interface TestInterface
{
    public function getById(string $id, int $size = 10);
}
"#;

    fn fixture_channel() -> Arc<ScriptedChannel> {
        Arc::new(ScriptedChannel::new(|_, argv| {
            let joined = argv.join(" ");
            if argv.first().map(String::as_str) == Some("find") {
                ok_result("app/code/Foo/Bar/etc/webapi.xml\n")
            } else if joined.contains("webapi.xml") {
                ok_result(WEBAPI_XML)
            } else if joined.contains("TestInterface.php") {
                ok_result(INTERFACE_PHP)
            } else {
                ok_result("")
            }
        }))
    }

    #[tokio::test]
    async fn test_discover_builds_full_endpoint() {
        let channel = fixture_channel();
        let endpoints = discover_endpoints(channel.clone(), "php-fpm", 4).await;

        assert_eq!(endpoints.len(), 1);
        let endpoint = &endpoints[0];
        assert_eq!(endpoint.id, r"Foo\Bar\Api\TestInterface.getById");
        assert_eq!(endpoint.path_template, "/V1/test/:id");
        assert_eq!(endpoint.http_method, "GET");
        assert_eq!(endpoint.auth_resource, "anonymous");
        assert_eq!(endpoint.module_name, "Foo/Bar");
        assert_eq!(endpoint.params.len(), 2);
        assert_eq!(endpoint.params[0].name, "id");
        assert!(endpoint.params[1].optional);

        // find, cat webapi.xml, cat interface
        assert_eq!(channel.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_discover_interface_fetch_uses_translated_path() {
        let channel = fixture_channel();
        discover_endpoints(channel.clone(), "php-fpm", 4).await;

        let argvs = channel.exec_argvs();
        let interface_fetch = argvs.last().expect("interface fetch");
        assert_eq!(interface_fetch[0], "bash");
        assert_eq!(interface_fetch[1], "-lc");
        assert!(interface_fetch[2].contains("app/code/Foo/Bar/Api/TestInterface.php"));
        assert!(interface_fetch[2].contains("test -f"));
    }

    #[tokio::test]
    async fn test_discover_empty_when_find_fails() {
        let channel = Arc::new(ScriptedChannel::always(err_result("no such directory")));
        let endpoints = discover_endpoints(channel, "php-fpm", 4).await;
        assert!(endpoints.is_empty());
    }

    #[tokio::test]
    async fn test_discover_skips_unreadable_files() {
        let channel = Arc::new(ScriptedChannel::new(|_, argv| {
            if argv.first().map(String::as_str) == Some("find") {
                ok_result("app/code/A/etc/webapi.xml\napp/code/B/etc/webapi.xml\n")
            } else if argv.join(" ").contains("A/etc") {
                err_result("permission denied")
            } else if argv.join(" ").contains("B/etc") {
                ok_result(WEBAPI_XML)
            } else {
                ok_result("")
            }
        }));
        let endpoints = discover_endpoints(channel, "php-fpm", 4).await;
        assert_eq!(endpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_discover_missing_interface_yields_empty_params() {
        let channel = Arc::new(ScriptedChannel::new(|_, argv| {
            let joined = argv.join(" ");
            if argv.first().map(String::as_str) == Some("find") {
                ok_result("app/code/Foo/Bar/etc/webapi.xml\n")
            } else if joined.contains("webapi.xml") {
                ok_result(WEBAPI_XML)
            } else {
                // `test -f missing || true` succeeds with empty stdout
                ok_result("")
            }
        }));
        let endpoints = discover_endpoints(channel, "php-fpm", 4).await;
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints[0].params.is_empty());
    }

    #[tokio::test]
    async fn test_discover_sorted_regardless_of_file_order() {
        let xml_b = r#"<route url="/V1/aaa" method="GET">
            <service class="Mod\B\Api\BInterface" method="list"/>
        </route>
        <route url="/V1/aaa" method="POST">
            <service class="Mod\B\Api\BInterface" method="save"/>
        </route>"#;
        let xml_a = r#"<route url="/V1/zzz" method="GET">
            <service class="Mod\A\Api\AInterface" method="list"/>
        </route>"#;

        let channel = Arc::new(ScriptedChannel::new(move |_, argv| {
            let joined = argv.join(" ");
            if argv.first().map(String::as_str) == Some("find") {
                // The later path sorts first; output order must not follow it.
                ok_result("app/code/Mod/A/etc/webapi.xml\napp/code/Mod/B/etc/webapi.xml\n")
            } else if joined.contains("Mod/A/etc") {
                ok_result(xml_a)
            } else if joined.contains("Mod/B/etc") {
                ok_result(xml_b)
            } else {
                ok_result("")
            }
        }));

        let endpoints = discover_endpoints(channel, "php-fpm", 2).await;
        let keys: Vec<(String, String)> = endpoints
            .iter()
            .map(|e| (e.path_template.clone(), e.http_method.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("/V1/aaa".to_string(), "GET".to_string()),
                ("/V1/aaa".to_string(), "POST".to_string()),
                ("/V1/zzz".to_string(), "GET".to_string()),
            ]
        );
    }

    #[test]
    fn test_endpoint_serializes_camel_case() {
        let endpoint = Endpoint {
            id: "A\\B.get".to_string(),
            path_template: "/V1/x".to_string(),
            http_method: "GET".to_string(),
            auth_resource: "anonymous".to_string(),
            service_class: "A\\B".to_string(),
            service_method: "get".to_string(),
            module_name: "A/B".to_string(),
            params: vec![EndpointParam {
                name: "id".to_string(),
                param_type: "string".to_string(),
                optional: false,
                default_value: None,
            }],
        };
        let json = serde_json::to_value(&endpoint).expect("serialize");
        assert_eq!(json["pathTemplate"], "/V1/x");
        assert_eq!(json["httpMethod"], "GET");
        assert_eq!(json["authResource"], "anonymous");
        assert_eq!(json["params"][0]["type"], "string");
        assert!(json["params"][0].get("defaultValue").is_none());
    }
}
