//! Project environment layer: .env parsing, Warden project validation, and
//! host derivation for a project root.
//!
//! The .env file is Warden's source of truth for the environment name and the
//! traefik vhost, so everything here works off a plain key/value read of it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::DockhandError;

/// Base URL for requests issued from inside the environment; nginx terminates
/// the vhost there regardless of the external traefik setup.
pub const CONTAINER_BASE_URL: &str = "http://nginx";

/// Parse `<root>/.env` into a key/value map.
///
/// Blank lines and `#` comments are skipped. Values keep everything after the
/// first `=`, with one pair of matching single or double quotes stripped.
/// A missing or unreadable file yields an empty map.
pub fn read_dot_env(project_root: &Path) -> HashMap<String, String> {
    let Ok(text) = std::fs::read_to_string(project_root.join(".env")) else {
        return HashMap::new();
    };

    let mut values = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = trimmed.find('=') else {
            continue;
        };
        let key = trimmed[..eq].trim().to_string();
        let mut value = trimmed[eq + 1..].trim();
        if value.len() >= 2 {
            let quoted = (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''));
            if quoted {
                value = &value[1..value.len() - 1];
            }
        }
        values.insert(key, value.to_string());
    }
    values
}

/// True when the directory carries a .env with a non-empty WARDEN_ENV_NAME.
pub fn is_warden_project(project_root: &Path) -> bool {
    read_dot_env(project_root)
        .get("WARDEN_ENV_NAME")
        .is_some_and(|name| !name.is_empty())
}

/// Fail unless the directory is a usable Warden project.
pub fn assert_warden_project(project_root: &Path) -> crate::Result<()> {
    if !project_root.join(".env").exists() {
        return Err(DockhandError::InvalidProject(
            project_root.display().to_string(),
            ".env not found. Is this a Warden project?".to_string(),
        ));
    }
    if !is_warden_project(project_root) {
        return Err(DockhandError::InvalidProject(
            project_root.display().to_string(),
            "WARDEN_ENV_NAME missing or empty in .env".to_string(),
        ));
    }
    Ok(())
}

/// Copy of the env map with credential-looking values redacted.
pub fn sanitize_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    let sensitive = Regex::new(r"(?i)SECRET|PASSWORD|TOKEN|KEY").expect("valid regex");
    env.iter()
        .map(|(key, value)| {
            let shown = if sensitive.is_match(key) {
                "***redacted***".to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect()
}

/// `[<WARDEN_ENV_NAME>]`, falling back to the directory basename. Prefixes
/// every tool report so operators juggling projects can tell outputs apart.
pub fn project_badge(project_root: &Path) -> String {
    let name = read_dot_env(project_root)
        .get("WARDEN_ENV_NAME")
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|component| component.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        });
    format!("[{}]", name)
}

/// (host, base URL) for requests against the external traefik vhost.
///
/// The vhost needs both TRAEFIK_SUBDOMAIN and TRAEFIK_DOMAIN, otherwise the
/// host falls back to localhost. Protocol follows TRAEFIK_TLS.
pub fn external_host(env: &HashMap<String, String>) -> (String, String) {
    let host = match (env.get("TRAEFIK_SUBDOMAIN"), env.get("TRAEFIK_DOMAIN")) {
        (Some(subdomain), Some(domain)) if !subdomain.is_empty() && !domain.is_empty() => {
            format!("{}.{}", subdomain, domain)
        }
        _ => "localhost".to_string(),
    };
    let protocol = if env.get("TRAEFIK_TLS").map(String::as_str) == Some("true") {
        "https"
    } else {
        "http"
    };
    let base = format!("{}://{}", protocol, host);
    (host, base)
}

/// Host header paired with [`CONTAINER_BASE_URL`] for in-container requests.
/// The domain alone is enough here; the subdomain is prepended when set.
pub fn container_host(env: &HashMap<String, String>) -> String {
    let domain = env
        .get("TRAEFIK_DOMAIN")
        .filter(|value| !value.is_empty())
        .map(String::as_str)
        .unwrap_or("localhost");
    match env.get("TRAEFIK_SUBDOMAIN").filter(|value| !value.is_empty()) {
        Some(subdomain) => format!("{}.{}", subdomain, domain),
        None => domain.to_string(),
    }
}

/// One project found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProject {
    pub path: PathBuf,
    pub env_name: Option<String>,
    pub traefik_domain: Option<String>,
}

/// Scan base directories for Warden projects: DOCKHAND_SCAN_DIRS
/// (":"-separated) when set, otherwise ~/Sites and ~/Projects where present.
pub fn default_scan_dirs() -> Vec<PathBuf> {
    if let Ok(raw) = std::env::var("DOCKHAND_SCAN_DIRS") {
        let dirs: Vec<PathBuf> = raw
            .split(':')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PathBuf::from)
            .collect();
        if !dirs.is_empty() {
            return dirs;
        }
    }
    let Some(home) = std::env::var_os("HOME").map(PathBuf::from) else {
        return Vec::new();
    };
    [home.join("Sites"), home.join("Projects")]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Immediate subdirectories of each base that hold a Warden project, sorted
/// by path for stable output.
pub fn discover_projects(scan_dirs: &[PathBuf]) -> Vec<DiscoveredProject> {
    let mut found = Vec::new();
    for base in scan_dirs {
        let Ok(entries) = std::fs::read_dir(base) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !is_warden_project(&path) {
                continue;
            }
            let env = read_dot_env(&path);
            found.push(DiscoveredProject {
                path,
                env_name: env.get("WARDEN_ENV_NAME").cloned(),
                traefik_domain: env.get("TRAEFIK_DOMAIN").cloned(),
            });
        }
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}
