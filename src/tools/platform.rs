//! Platform tools: bin/magento operations inside the php service.
//!
//! Every handler runs the command through the channel, picks stdout on
//! success or stderr on failure, strips the log noise, and prefixes the
//! project badge so the output is safe to hand straight to the caller.

use std::fmt;

use serde::Deserialize;
use serde_json::json;

use crate::exec::policy;
use crate::exec::sanitize::sanitize;
use crate::exec::warden::{run_magento, run_magento_with, MAGENTO_PHP_FLAGS};
use crate::tools::{ToolContext, ToolId, ToolSpec};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheArgs {
    /// Cache types to target; all when omitted.
    pub types: Option<Vec<String>>,
    pub nuke: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NukeArgs {
    pub nuke: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticDeployArgs {
    pub languages: Option<Vec<String>>,
    pub area: Option<DeployArea>,
    pub jobs: Option<u32>,
    pub force: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSetArgs {
    pub mode: DeployMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSetArgs {
    pub path: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigShowArgs {
    pub path: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    Developer,
    Production,
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployMode::Developer => f.write_str("developer"),
            DeployMode::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployArea {
    Adminhtml,
    Frontend,
}

impl DeployArea {
    fn as_str(self) -> &'static str {
        match self {
            DeployArea::Adminhtml => "adminhtml",
            DeployArea::Frontend => "frontend",
        }
    }
}

/// rm -rf of generated code and filesystem caches, for the nuke option.
/// Result is intentionally ignored; the follow-up command reports.
async fn nuke_filesystem(context: &ToolContext) {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        "rm -rf pub/static/* var/view_preprocessed/* var/cache/* var/page_cache/* generated/*"
            .to_string(),
    ];
    let _ = context
        .channel
        .execute(&context.php_service, &argv, policy::DEFAULT_TIMEOUT)
        .await;
}

fn magento_args(command: &str, rest: Vec<String>) -> Vec<String> {
    let mut args = vec![command.to_string()];
    args.extend(rest);
    args
}

async fn run_and_report(context: &ToolContext, title: &str, args: &[String]) -> String {
    let result = run_magento(context.channel.as_ref(), &context.php_service, args).await;
    let raw = if result.success {
        result.stdout
    } else {
        result.stderr
    };
    format!("{} {}\n\n{}", context.badge(), title, sanitize(&raw))
}

pub async fn cache_clean(context: &ToolContext, args: CacheArgs) -> String {
    if args.nuke.unwrap_or(false) {
        nuke_filesystem(context).await;
    }
    let command = magento_args("cache:clean", args.types.unwrap_or_default());
    run_and_report(context, "Cache Clean", &command).await
}

pub async fn cache_flush(context: &ToolContext, args: CacheArgs) -> String {
    if args.nuke.unwrap_or(false) {
        nuke_filesystem(context).await;
    }
    let command = magento_args("cache:flush", args.types.unwrap_or_default());
    run_and_report(context, "Cache Flush", &command).await
}

/// setup:upgrade followed by cache:clean; both outputs land in the report.
pub async fn setup_upgrade(context: &ToolContext, args: NukeArgs) -> String {
    if args.nuke.unwrap_or(false) {
        nuke_filesystem(context).await;
    }
    let channel = context.channel.as_ref();
    let upgraded = run_magento(channel, &context.php_service, &["setup:upgrade".to_string()]).await;
    let cleaned = run_magento(channel, &context.php_service, &["cache:clean".to_string()]).await;

    let mut sections = Vec::new();
    for result in [upgraded, cleaned] {
        let text = if result.stdout.is_empty() {
            result.stderr
        } else {
            result.stdout
        };
        let clean = sanitize(&text);
        if !clean.is_empty() {
            sections.push(clean);
        }
    }
    format!("{} Setup Upgrade\n\n{}", context.badge(), sections.join("\n\n"))
}

/// setup:di:compile under the bespoke budget; the title carries the verdict
/// and wall time since this is the one people wait on.
pub async fn di_compile(context: &ToolContext, args: NukeArgs) -> String {
    if args.nuke.unwrap_or(false) {
        nuke_filesystem(context).await;
    }
    let php_flags: Vec<String> = MAGENTO_PHP_FLAGS.iter().map(|s| s.to_string()).collect();
    let result = run_magento_with(
        context.channel.as_ref(),
        &context.php_service,
        &["setup:di:compile".to_string()],
        &php_flags,
        policy::COMPILE_TIMEOUT,
    )
    .await;

    let (title, raw) = if result.success {
        ("DI Compile Completed", result.stdout)
    } else {
        ("DI Compile Failed", result.stderr)
    };
    format!(
        "{} {} ({}ms)\n\n{}",
        context.badge(),
        title,
        result.duration_ms,
        sanitize(&raw)
    )
}

pub async fn static_deploy(context: &ToolContext, args: StaticDeployArgs) -> String {
    let mut rest = args.languages.unwrap_or_default();
    if let Some(area) = args.area {
        rest.push("--area".to_string());
        rest.push(area.as_str().to_string());
    }
    if let Some(jobs) = args.jobs {
        rest.push("--jobs".to_string());
        rest.push(jobs.to_string());
    }
    if args.force.unwrap_or(false) {
        rest.push("--force".to_string());
    }
    let command = magento_args("setup:static-content:deploy", rest);
    run_and_report(context, "Static Deploy", &command).await
}

pub async fn indexer_reindex(context: &ToolContext) -> String {
    run_and_report(context, "Indexer Reindex", &["indexer:reindex".to_string()]).await
}

pub async fn mode_show(context: &ToolContext) -> String {
    run_and_report(context, "Mode Show", &["deploy:mode:show".to_string()]).await
}

pub async fn mode_set(context: &ToolContext, args: ModeSetArgs) -> String {
    let command = vec!["deploy:mode:set".to_string(), args.mode.to_string()];
    let title = format!("Mode Set ({})", args.mode);
    run_and_report(context, &title, &command).await
}

pub async fn config_set(context: &ToolContext, args: ConfigSetArgs) -> String {
    let command = vec!["config:set".to_string(), args.path, args.value];
    run_and_report(context, "Config Set", &command).await
}

pub async fn config_show(context: &ToolContext, args: ConfigShowArgs) -> String {
    let command = vec!["config:show".to_string(), args.path.clone()];
    let result = run_magento(context.channel.as_ref(), &context.php_service, &command).await;
    let raw = if result.success {
        result.stdout
    } else {
        result.stderr
    };
    let clean = sanitize(&raw);
    let shown = if clean.is_empty() {
        format!("Configuration {} not found", args.path)
    } else {
        clean
    };
    format!("{} Config Show\n\n{}", context.badge(), shown)
}

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            id: ToolId::CacheClean,
            name: "magento_cache_clean",
            description: "Run bin/magento cache:clean, optionally limited to specific cache types",
            schema: json!({
                "type": "object",
                "properties": {
                    "types": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Cache types to clean; all types when omitted"
                    },
                    "nuke": {
                        "type": "boolean",
                        "description": "First rm -rf filesystem caches and generated code"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::CacheFlush,
            name: "magento_cache_flush",
            description: "Run bin/magento cache:flush, optionally limited to specific cache types",
            schema: json!({
                "type": "object",
                "properties": {
                    "types": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Cache types to flush; all types when omitted"
                    },
                    "nuke": {
                        "type": "boolean",
                        "description": "First rm -rf filesystem caches and generated code"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::SetupUpgrade,
            name: "magento_setup_upgrade",
            description: "Run bin/magento setup:upgrade followed by cache:clean",
            schema: json!({
                "type": "object",
                "properties": {
                    "nuke": {
                        "type": "boolean",
                        "description": "First rm -rf filesystem caches and generated code"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::DiCompile,
            name: "magento_di_compile",
            description: "Run bin/magento setup:di:compile with an unbounded php memory limit",
            schema: json!({
                "type": "object",
                "properties": {
                    "nuke": {
                        "type": "boolean",
                        "description": "First rm -rf filesystem caches and generated code"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::StaticDeploy,
            name: "magento_static_deploy",
            description: "Run bin/magento setup:static-content:deploy",
            schema: json!({
                "type": "object",
                "properties": {
                    "languages": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Locales to deploy, e.g. en_US"
                    },
                    "area": {
                        "type": "string",
                        "enum": ["adminhtml", "frontend"],
                        "description": "Limit deployment to one area"
                    },
                    "jobs": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Parallel deploy jobs"
                    },
                    "force": {
                        "type": "boolean",
                        "description": "Deploy regardless of the current mode"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::IndexerReindex,
            name: "magento_indexer_reindex",
            description: "Run bin/magento indexer:reindex for all indexers",
            schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            id: ToolId::ModeShow,
            name: "magento_mode_show",
            description: "Show the current deploy mode (bin/magento deploy:mode:show)",
            schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            id: ToolId::ModeSet,
            name: "magento_mode_set",
            description: "Switch the deploy mode (bin/magento deploy:mode:set)",
            schema: json!({
                "type": "object",
                "properties": {
                    "mode": {
                        "type": "string",
                        "enum": ["developer", "production"],
                        "description": "Target deploy mode"
                    }
                },
                "required": ["mode"]
            }),
        },
        ToolSpec {
            id: ToolId::ConfigSet,
            name: "magento_config_set",
            description: "Set a core config value (bin/magento config:set <path> <value>)",
            schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Config path, e.g. web/secure/base_url"},
                    "value": {"type": "string", "description": "Value to store"}
                },
                "required": ["path", "value"]
            }),
        },
        ToolSpec {
            id: ToolId::ConfigShow,
            name: "magento_config_show",
            description: "Show a core config value (bin/magento config:show <path>)",
            schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Config path, e.g. web/secure/base_url"}
                },
                "required": ["path"]
            }),
        },
    ]
}
