//! Route-block extraction from webapi.xml text.
//!
//! Pattern extraction rather than XML parsing: route blocks are matched with
//! a regex and blocks without a service declaration are skipped outright.

use regex::Regex;

/// Fields extracted from one `<route>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBlock {
    pub path_template: String,
    pub http_method: String,
    pub service_class: String,
    pub service_method: String,
    pub auth_resource: String,
}

/// Extract every route block from webapi.xml text.
///
/// A block must carry `<service class=".." method=".."/>` to be kept. The
/// `<resource ref=".."/>` declaration is optional and defaults to "unknown".
pub fn extract_routes(xml: &str) -> Vec<RouteBlock> {
    let route_re = Regex::new(r#"(?s)<route\s+url="([^"]+)"\s+method="([^"]+)">(.*?)</route>"#)
        .expect("valid regex");
    let service_re =
        Regex::new(r#"<service\s+class="([^"]+)"\s+method="([^"]+)"\s*/?>"#).expect("valid regex");
    let resource_re = Regex::new(r#"<resource\s+ref="([^"]+)"\s*/?>"#).expect("valid regex");

    let mut blocks = Vec::new();
    for route in route_re.captures_iter(xml) {
        let inner = &route[3];
        let Some(service) = service_re.captures(inner) else {
            continue;
        };
        let auth_resource = resource_re
            .captures(inner)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "unknown".to_string());
        blocks.push(RouteBlock {
            path_template: route[1].to_string(),
            http_method: route[2].to_string(),
            service_class: service[1].to_string(),
            service_method: service[2].to_string(),
            auth_resource,
        });
    }
    blocks
}

/// First two backslash-delimited segments of a service class, joined with
/// `/`. `Magento\Catalog\Api\ProductRepositoryInterface` -> `Magento/Catalog`.
pub fn module_name(service_class: &str) -> String {
    service_class
        .split('\\')
        .take(2)
        .collect::<Vec<_>>()
        .join("/")
}
