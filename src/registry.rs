//! ToolRegistry — the single entry point for dockhand's tool surface.
//!
//! Built once at startup from the static tool declarations: duplicate names
//! are a construction error, so every advertised name is canonical for the
//! lifetime of the server. Calls route by name; handlers answer with report
//! text, and only unknown tools or undecodable arguments surface as errors.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, Tool};

use crate::error::DockhandError;
use crate::tools::{self, ToolContext, ToolId, ToolSpec};

pub struct ToolRegistry {
    context: ToolContext,
    /// Canonical name -> tool id, populated once at construction.
    ids: HashMap<&'static str, ToolId>,
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Build the registry, registering every tool declaration exactly once.
    pub fn new(context: ToolContext) -> crate::Result<Self> {
        let specs = tools::all_specs();
        let mut ids: HashMap<&'static str, ToolId> = HashMap::with_capacity(specs.len());
        let mut advertised = Vec::with_capacity(specs.len());

        for spec in &specs {
            if ids.insert(spec.name, spec.id).is_some() {
                return Err(DockhandError::DuplicateTool(spec.name.to_string()));
            }
            advertised.push(to_rmcp_tool(spec));
        }

        tracing::debug!(tools = advertised.len(), "tool registry built");
        Ok(ToolRegistry {
            context,
            ids,
            tools: advertised,
        })
    }

    /// Snapshot of every advertised tool, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Call a tool by canonical name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> crate::Result<CallToolResult> {
        let Some(&id) = self.ids.get(name) else {
            return Err(DockhandError::UnknownTool(name.to_string()));
        };

        tracing::info!(tool = %name, "tool call");
        let report =
            tools::dispatch(&self.context, id, name, arguments.unwrap_or_default()).await?;

        Ok(CallToolResult {
            content: vec![Content::text(report)],
            is_error: Some(false),
            structured_content: None,
            meta: None,
        })
    }
}

fn to_rmcp_tool(spec: &ToolSpec) -> Tool {
    let schema = spec.schema.as_object().cloned().unwrap_or_default();
    Tool {
        name: spec.name.into(),
        title: None,
        description: Some(spec.description.into()),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}
