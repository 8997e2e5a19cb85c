//! DockhandMcpServer — rmcp ServerHandler backed by the ToolRegistry.
//!
//! The registry is immutable after startup, so all sessions share one
//! `Arc<ToolRegistry>`. `StreamableHttpService` calls its factory closure per
//! session; each clone points at the same registry.

use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData as McpError;

use crate::ToolRegistry;

#[derive(Clone)]
pub struct DockhandMcpServer {
    registry: Arc<ToolRegistry>,
    /// Advertised as `dockhand-<env name>` so clients juggling several
    /// projects can tell the servers apart.
    server_name: String,
}

impl DockhandMcpServer {
    pub fn new(registry: ToolRegistry, server_name: String) -> Self {
        Self {
            registry: Arc::new(registry),
            server_name,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

impl ServerHandler for DockhandMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: self.server_name.clone().into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Warden/Magento environment control — bin/magento operations, web API \
                 discovery, and endpoint invocation through the container exec channel."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.registry.tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.registry
            .call_tool(&request.name, request.arguments)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ok_result, test_context, ScriptedChannel};

    fn make_server() -> (DockhandMcpServer, tempfile::TempDir) {
        let channel = Arc::new(ScriptedChannel::new(|_, _| ok_result("output")));
        let (context, dir) = test_context(channel);
        let registry = ToolRegistry::new(context).expect("registry");
        (
            DockhandMcpServer::new(registry, "dockhand-proj".to_string()),
            dir,
        )
    }

    #[test]
    fn test_get_info_identity() {
        let (server, _dir) = make_server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "dockhand-proj");
        assert!(
            info.capabilities.tools.is_some(),
            "tools capability should be enabled"
        );
        assert!(info.instructions.is_some(), "instructions should be set");
    }

    #[test]
    fn test_clones_share_one_registry() {
        let (server, _dir) = make_server();
        let clone = server.clone();
        assert!(Arc::ptr_eq(&server.registry, &clone.registry));
    }

    #[test]
    fn test_registry_exposes_full_surface() {
        let (server, _dir) = make_server();
        assert_eq!(server.registry().tool_count(), 21);
    }
}
