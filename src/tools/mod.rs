//! The MCP tool surface, grouped by concern: platform tools drive
//! bin/magento, api tools discover and call the web APIs, environment tools
//! cover warden-level operations.
//!
//! Handlers never fail: operational problems (non-zero exits, timeouts,
//! unreachable services) come back as report text so the calling model can
//! read and react to them. Only unknown tools and undecodable arguments
//! surface as errors.

pub mod api;
pub mod environment;
pub mod platform;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DockhandError;
use crate::exec::RemoteChannel;
use crate::project;

/// Shared context every tool handler receives.
#[derive(Clone)]
pub struct ToolContext {
    pub project_root: PathBuf,
    pub channel: Arc<dyn RemoteChannel>,
    /// Service that runs php and bin/magento.
    pub php_service: String,
    pub discovery_parallelism: usize,
    /// Host-side punchin XML used when a call doesn't supply its own path.
    pub punchin_xml_path: Option<PathBuf>,
}

impl ToolContext {
    /// `[<env name>]` report prefix for this project.
    pub fn badge(&self) -> String {
        project::project_badge(&self.project_root)
    }

    pub fn dot_env(&self) -> HashMap<String, String> {
        project::read_dot_env(&self.project_root)
    }
}

/// Canonical identity of every tool dockhand exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    CacheClean,
    CacheFlush,
    SetupUpgrade,
    DiCompile,
    StaticDeploy,
    IndexerReindex,
    ModeShow,
    ModeSet,
    ConfigSet,
    ConfigShow,
    ApiDocs,
    ApiDocsEndpoint,
    ApiTry,
    ApiCall,
    ApiDiscover,
    WardenExec,
    WardenLogsTail,
    WardenShowEnv,
    WardenVarnishFlush,
    WardenRedisFlushAll,
    WardenDiscoverProjects,
}

/// Declaration of one tool: canonical name, description, input schema.
pub struct ToolSpec {
    pub id: ToolId,
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// Every tool declaration, in registration order.
pub fn all_specs() -> Vec<ToolSpec> {
    let mut specs = platform::specs();
    specs.extend(api::specs());
    specs.extend(environment::specs());
    specs
}

/// Route a call to its handler. Arguments that fail to deserialize return
/// `InvalidArguments`; handler outcomes are always report text.
pub async fn dispatch(
    context: &ToolContext,
    id: ToolId,
    name: &str,
    arguments: serde_json::Map<String, Value>,
) -> crate::Result<String> {
    let args = Value::Object(arguments);
    let report = match id {
        ToolId::CacheClean => platform::cache_clean(context, parse_args(name, args)?).await,
        ToolId::CacheFlush => platform::cache_flush(context, parse_args(name, args)?).await,
        ToolId::SetupUpgrade => platform::setup_upgrade(context, parse_args(name, args)?).await,
        ToolId::DiCompile => platform::di_compile(context, parse_args(name, args)?).await,
        ToolId::StaticDeploy => platform::static_deploy(context, parse_args(name, args)?).await,
        ToolId::IndexerReindex => platform::indexer_reindex(context).await,
        ToolId::ModeShow => platform::mode_show(context).await,
        ToolId::ModeSet => platform::mode_set(context, parse_args(name, args)?).await,
        ToolId::ConfigSet => platform::config_set(context, parse_args(name, args)?).await,
        ToolId::ConfigShow => platform::config_show(context, parse_args(name, args)?).await,
        ToolId::ApiDocs => api::api_docs(context, parse_args(name, args)?).await,
        ToolId::ApiDocsEndpoint => api::api_docs_endpoint(context, parse_args(name, args)?).await,
        ToolId::ApiTry => api::api_try(context, parse_args(name, args)?).await,
        ToolId::ApiCall => api::api_call(context, parse_args(name, args)?).await,
        ToolId::ApiDiscover => api::api_discover(context, parse_args(name, args)?).await,
        ToolId::WardenExec => environment::exec(context, parse_args(name, args)?).await,
        ToolId::WardenLogsTail => environment::logs_tail(context, parse_args(name, args)?).await,
        ToolId::WardenShowEnv => environment::show_env(context).await,
        ToolId::WardenVarnishFlush => environment::varnish_flush(context).await,
        ToolId::WardenRedisFlushAll => environment::redis_flush_all(context).await,
        ToolId::WardenDiscoverProjects => {
            environment::discover_projects(parse_args(name, args)?)
        }
    };
    Ok(report)
}

fn parse_args<T: DeserializeOwned>(name: &str, value: Value) -> crate::Result<T> {
    serde_json::from_value(value)
        .map_err(|source| DockhandError::InvalidArguments(name.to_string(), source.to_string()))
}
