//! Dockhand — standalone MCP server for Warden-managed Magento environments.
//! Exposes bin/magento maintenance commands, web API catalog discovery, and
//! endpoint invocation as MCP tools. Every remote operation is an argv run
//! through `warden env exec`, so nothing here needs a PHP runtime on the host.

pub mod api;
pub mod config;
pub mod error;
pub mod exec;
pub mod project;
pub mod registry;
pub mod server;
pub mod tools;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::auth::punchin_cookie_args;
pub use api::catalog::{discover_endpoints, Endpoint, EndpointParam};
pub use api::invoke::{query_string, render_path, TryOutcome, TryRequest};
pub use config::{AuthConfig, DiscoveryConfig, DockhandConfig, HttpConfig, ProjectConfig};
pub use error::{DockhandError, Result};
pub use exec::runner::{run, RunResult};
pub use exec::warden::WardenChannel;
pub use exec::RemoteChannel;
pub use project::{
    assert_warden_project, discover_projects, is_warden_project, read_dot_env, sanitize_env,
};
pub use registry::ToolRegistry;
pub use server::DockhandMcpServer;
pub use tools::ToolContext;
