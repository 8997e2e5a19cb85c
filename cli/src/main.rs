//! Dockhand — standalone MCP server for Warden-managed Magento environments.
//!
//! Two subcommands:
//! - `dockhand serve`: Streamable HTTP MCP server exposing the tool surface
//! - `dockhand stdio`: STDIO transport for Claude Desktop and other STDIO-based MCP clients

use std::path::{Path, PathBuf};

use anyhow::Result;
use std::sync::Arc;

use axum::http::Request;
use axum::response::IntoResponse;
use axum::Router;
use clap::{Parser, Subcommand};
use dockhand::{
    DockhandConfig, DockhandMcpServer, RemoteChannel, ToolContext, ToolRegistry, WardenChannel,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt as TowerServiceExt;
use tracing_subscriber::EnvFilter;

/// Dockhand — standalone MCP server for Warden-managed Magento environments.
#[derive(Parser)]
#[command(
    name = "dockhand",
    version,
    about = "Dockhand — standalone MCP server for Warden-managed Magento environments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a Streamable HTTP MCP server for one Warden project
    Serve {
        /// Path to dockhand.toml config file [default: ./dockhand.toml or ~/.config/dockhand/dockhand.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Warden project root (overrides config) [default: current directory]
        #[arg(long)]
        project_root: Option<PathBuf>,
        /// HTTP port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
    },
    /// Bridge the tool surface over STDIO (for Claude Desktop, etc.)
    Stdio {
        /// Path to dockhand.toml config file [default: ./dockhand.toml or ~/.config/dockhand/dockhand.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Warden project root (overrides config) [default: current directory]
        #[arg(long)]
        project_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    // Ctrl-C handler — cancels the root token for graceful shutdown
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down Dockhand...");
        cancel_for_signal.cancel();
    });

    match cli.command {
        Commands::Serve {
            config,
            project_root,
            port,
            host,
        } => {
            run_serve(config, project_root, host, port, cancel).await?;
        }
        Commands::Stdio {
            config,
            project_root,
        } => {
            run_stdio(config, project_root, cancel).await?;
        }
    }

    Ok(())
}

/// Start a Streamable HTTP MCP server for one Warden project.
///
/// Loads dockhand.toml (if any), builds the ToolRegistry against the resolved
/// project root, then serves via StreamableHttpService + axum.
async fn run_serve(
    config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut config = load_config(resolve_config(config_path)).await?;
    if let Some(host) = host {
        config.http.host = host;
    }
    if let Some(port) = port {
        config.http.port = port;
    }
    let http = config.http.clone();

    let server = build_server(config, project_root)?;

    // Set up the Streamable HTTP MCP service
    let session_manager = Arc::new(LocalSessionManager::default());
    let http_config = StreamableHttpServerConfig {
        cancellation_token: cancel.clone(),
        ..Default::default()
    };
    let server_for_factory = server.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(server_for_factory.clone()),
        session_manager,
        http_config,
    );

    let app = Router::new().fallback(move |req: Request<axum::body::Body>| {
        let svc = mcp_service.clone();
        async move { svc.oneshot(req).await.unwrap().into_response() }
    });

    let addr = format!("{}:{}", http.host, http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(host = %http.host, port = %http.port, "Dockhand HTTP server listening");
    tracing::info!("Connect your MCP client to http://{}:{}/mcp", http.host, http.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("Dockhand HTTP server error: {}", e))?;

    tracing::info!("Dockhand HTTP server stopped");
    Ok(())
}

/// Bridge the tool surface over STDIO for STDIO-based MCP clients.
async fn run_stdio(
    config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    cancel: CancellationToken,
) -> Result<()> {
    let config = load_config(resolve_config(config_path)).await?;
    let server = build_server(config, project_root)?;

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let running = server
        .serve_with_ct(transport, cancel.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize Dockhand stdio transport: {:?}", e))?;

    tracing::info!("Dockhand stdio transport initialized, waiting for messages");

    tokio::select! {
        result = running.waiting() => {
            match result {
                Ok(reason) => {
                    tracing::info!(?reason, "Dockhand stdio transport completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Dockhand stdio transport error");
                    return Err(anyhow::anyhow!("Dockhand stdio transport error: {}", e));
                }
            }
        }
        _ = cancel.cancelled() => {
            tracing::info!("Dockhand stdio transport cancelled");
        }
    }

    Ok(())
}

/// Build the MCP server for the resolved project root.
///
/// The root comes from `--project-root`, then `[project] root` in config,
/// then the current directory. The root must hold a Warden `.env` with a
/// non-empty WARDEN_ENV_NAME.
fn build_server(config: DockhandConfig, project_root: Option<PathBuf>) -> Result<DockhandMcpServer> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    let root = project_root
        .or_else(|| config.project.root.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let root = root.canonicalize().unwrap_or(root);

    dockhand::assert_warden_project(&root).map_err(|e| {
        anyhow::anyhow!(
            "{}\nUsage: dockhand <serve|stdio> --project-root /path/to/warden/project",
            e
        )
    })?;

    let env = dockhand::read_dot_env(&root);
    let env_name = env.get("WARDEN_ENV_NAME").cloned().unwrap_or_default();

    let channel: Arc<dyn RemoteChannel> = Arc::new(WardenChannel::new(root.clone()));
    let context = ToolContext {
        project_root: root,
        channel,
        php_service: config.project.php_service.clone(),
        discovery_parallelism: config.discovery.parallelism,
        punchin_xml_path: config.auth.punchin_xml_path.clone(),
    };

    let registry = ToolRegistry::new(context)
        .map_err(|e| anyhow::anyhow!("Failed to build tool registry: {}", e))?;
    tracing::info!(project = %env_name, tools = registry.tool_count(), "Dockhand registry ready");

    Ok(DockhandMcpServer::new(
        registry,
        format!("dockhand-{}", env_name),
    ))
}

/// Resolve config file path: explicit flag → ./dockhand.toml → ~/.config/dockhand/dockhand.toml.
///
/// Unlike the project root, config is optional — `None` means run on defaults.
fn resolve_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    let local = Path::new("dockhand.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("dockhand").join("dockhand.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }

    None
}

/// Load and parse a dockhand.toml config file, or fall back to defaults.
async fn load_config(config_path: Option<PathBuf>) -> Result<DockhandConfig> {
    let Some(config_path) = config_path else {
        tracing::debug!("no dockhand.toml found, using defaults");
        return Ok(DockhandConfig::default());
    };
    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", config_path, e))?;
    let config: DockhandConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", config_path, e))?;
    Ok(config)
}
