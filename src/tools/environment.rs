//! Environment tools: warden-level operations that don't go through
//! bin/magento. Arbitrary exec, log tailing, .env inspection, cache service
//! flushes, and cross-project discovery.

use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::exec::policy;
use crate::project;
use crate::tools::{ToolContext, ToolId, ToolSpec};

const MAX_ARGV_LEN: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecArgs {
    pub service: String,
    pub argv: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogsTailArgs {
    pub services: Vec<String>,
    pub tail_lines: u32,
}

impl Default for LogsTailArgs {
    fn default() -> Self {
        LogsTailArgs {
            services: vec!["nginx".to_string(), "php-fpm".to_string()],
            tail_lines: 200,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverProjectsArgs {
    pub scan_dirs: Option<Vec<String>>,
}

/// Reject exec input before anything is spawned. Service names must look
/// like compose service identifiers; argv is bounded so runaway tool calls
/// can't assemble giant command lines.
fn validate_exec_input(service: &str, argv: &[String]) -> Result<(), String> {
    let service_re = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex");
    if !service_re.is_match(service) {
        return Err(format!("invalid service name: '{}'", service));
    }
    if argv.is_empty() {
        return Err("argv must not be empty".to_string());
    }
    if argv.len() > MAX_ARGV_LEN {
        return Err(format!(
            "argv too long: {} entries (max {})",
            argv.len(),
            MAX_ARGV_LEN
        ));
    }
    Ok(())
}

pub async fn exec(context: &ToolContext, args: ExecArgs) -> String {
    let badge = context.badge();
    if let Err(reason) = validate_exec_input(&args.service, &args.argv) {
        return format!("{} Exec Validation Error\n\n{}", badge, reason);
    }

    let timeout = policy::timeout_for(&args.argv);
    let result = context.channel.execute(&args.service, &args.argv, timeout).await;
    let text = if result.success {
        result.stdout
    } else {
        format!("{}\n{}", result.stdout, result.stderr)
    };
    format!(
        "{} Exec [{}] {}\n\n{}",
        badge,
        args.service,
        args.argv.join(" "),
        text
    )
}

pub async fn logs_tail(context: &ToolContext, args: LogsTailArgs) -> String {
    let tail_lines = args.tail_lines.clamp(1, 5000);
    let result = context.channel.logs_tail(&args.services, tail_lines).await;
    let text = if result.success {
        result.stdout
    } else {
        result.stderr
    };
    format!(
        "{} Logs Tail [{}] last {} lines\n\n{}",
        context.badge(),
        args.services.join(", "),
        tail_lines,
        text
    )
}

/// The project .env with credential-looking values redacted, sorted by key.
pub async fn show_env(context: &ToolContext) -> String {
    let sanitized = project::sanitize_env(&context.dot_env());
    let mut entries: Vec<(String, String)> = sanitized.into_iter().collect();
    entries.sort();

    let listing = entries
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n");
    let shown = if listing.is_empty() {
        "(empty)".to_string()
    } else {
        listing
    };
    format!("{} Environment\n\n{}", context.badge(), shown)
}

pub async fn varnish_flush(context: &ToolContext) -> String {
    let argv = vec![
        "varnishadm".to_string(),
        "ban".to_string(),
        "req.url ~ .".to_string(),
    ];
    let result = context
        .channel
        .execute("varnish", &argv, policy::DEFAULT_TIMEOUT)
        .await;
    let text = if result.success {
        result.stdout
    } else {
        result.stderr
    };
    format!("{} Varnish Flush\n\n{}", context.badge(), text)
}

pub async fn redis_flush_all(context: &ToolContext) -> String {
    let argv = vec!["redis-cli".to_string(), "flushall".to_string()];
    let result = context
        .channel
        .execute("redis", &argv, policy::DEFAULT_TIMEOUT)
        .await;
    let text = if result.success {
        result.stdout
    } else {
        result.stderr
    };
    format!("{} Redis Flush All\n\n{}", context.badge(), text)
}

/// Scan for Warden projects on the host filesystem. No badge here; the
/// output spans projects.
pub fn discover_projects(args: DiscoverProjectsArgs) -> String {
    let bases: Vec<PathBuf> = match args.scan_dirs {
        Some(dirs) if !dirs.is_empty() => dirs.into_iter().map(PathBuf::from).collect(),
        _ => project::default_scan_dirs(),
    };
    let bases: Vec<PathBuf> = bases.into_iter().filter(|dir| dir.is_dir()).collect();

    let found = project::discover_projects(&bases);
    if found.is_empty() {
        return "No Warden projects found.".to_string();
    }

    found
        .iter()
        .map(|candidate| {
            let env_name = candidate.env_name.as_deref().unwrap_or("?");
            match &candidate.traefik_domain {
                Some(domain) => format!(
                    "{}  (env: {}, traefik: {})",
                    candidate.path.display(),
                    env_name,
                    domain
                ),
                None => format!("{}  (env: {})", candidate.path.display(), env_name),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            id: ToolId::WardenExec,
            name: "warden_exec",
            description: "Run an arbitrary command in a service container (warden env exec)",
            schema: json!({
                "type": "object",
                "properties": {
                    "service": {
                        "type": "string",
                        "description": "Compose service name, e.g. php-fpm, db, redis"
                    },
                    "argv": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 50,
                        "description": "Command and arguments"
                    }
                },
                "required": ["service", "argv"]
            }),
        },
        ToolSpec {
            id: ToolId::WardenLogsTail,
            name: "warden_logs_tail",
            description: "Tail service logs (warden env logs --tail)",
            schema: json!({
                "type": "object",
                "properties": {
                    "services": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Services to tail [default: nginx, php-fpm]"
                    },
                    "tailLines": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 5000,
                        "description": "Lines per service [default: 200]"
                    }
                }
            }),
        },
        ToolSpec {
            id: ToolId::WardenShowEnv,
            name: "warden_show_env",
            description: "Show the project .env with credentials redacted",
            schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            id: ToolId::WardenVarnishFlush,
            name: "warden_varnish_flush",
            description: "Ban every URL in varnish (varnishadm ban)",
            schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            id: ToolId::WardenRedisFlushAll,
            name: "warden_redis_flush_all",
            description: "Flush all redis databases (redis-cli flushall)",
            schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            id: ToolId::WardenDiscoverProjects,
            name: "warden_discover_projects",
            description: "Scan the host filesystem for Warden projects",
            schema: json!({
                "type": "object",
                "properties": {
                    "scanDirs": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Directories to scan [default: DOCKHAND_SCAN_DIRS or ~/Sites and ~/Projects]"
                    }
                }
            }),
        },
    ]
}
