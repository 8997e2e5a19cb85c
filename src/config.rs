//! Dockhand configuration — deserialization and validation.
//!
//! All sections are optional; a missing `dockhand.toml` is equivalent to an
//! empty one. Defaults match a stock Warden install (php-fpm service, local
//! HTTP bind on port 3000).

use crate::error::DockhandError;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level Dockhand configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockhandConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Which Warden project to operate on and where Magento commands run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root containing the Warden `.env`. Overridable with
    /// `--project-root`; falls back to the current directory.
    pub root: Option<PathBuf>,
    /// Container that hosts the PHP runtime for `bin/magento` and curl.
    pub php_service: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: None,
            php_service: "php-fpm".to_string(),
        }
    }
}

/// Bind address for the Streamable HTTP transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Session-auth material for API invocation tools.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PunchIn XML payload posted to the token endpoint when a tool call
    /// requests authentication without inline XML.
    pub punchin_xml_path: Option<PathBuf>,
}

/// Tuning for webapi.xml catalog discovery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Concurrent `cat` fetches inside the PHP container.
    pub parallelism: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

impl DockhandConfig {
    /// Validate the config, failing fast on misconfigurations before any
    /// containers are contacted.
    pub fn validate(&self) -> crate::Result<()> {
        // 1. The PHP service name is baked into every exec argv
        if self.project.php_service.trim().is_empty() {
            return Err(DockhandError::InvalidConfig(
                "project.php_service must be non-empty".to_string(),
            ));
        }

        // 2. Discovery parallelism bounds the semaphore; 0 would deadlock
        if self.discovery.parallelism == 0 || self.discovery.parallelism > 32 {
            return Err(DockhandError::InvalidConfig(format!(
                "discovery.parallelism must be between 1 and 32, got {}",
                self.discovery.parallelism
            )));
        }

        // 3. Port 0 would bind an ephemeral port nobody can predict
        if self.http.port == 0 {
            return Err(DockhandError::InvalidConfig(
                "http.port must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_toml(toml_str: &str) -> DockhandConfig {
        toml::from_str(toml_str).expect("valid TOML")
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_toml("");
        assert_eq!(config.project.root, None);
        assert_eq!(config.project.php_service, "php-fpm");
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.auth.punchin_xml_path, None);
        assert_eq!(config.discovery.parallelism, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config_overrides() {
        let config = parse_toml(
            r#"
            [project]
            root = "/home/dev/sites/shop"
            php_service = "php-debug"

            [http]
            host = "0.0.0.0"
            port = 8080

            [auth]
            punchin_xml_path = "/home/dev/punchin.xml"

            [discovery]
            parallelism = 8
            "#,
        );
        assert_eq!(
            config.project.root,
            Some(PathBuf::from("/home/dev/sites/shop"))
        );
        assert_eq!(config.project.php_service, "php-debug");
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert_eq!(
            config.auth.punchin_xml_path,
            Some(PathBuf::from("/home/dev/punchin.xml"))
        );
        assert_eq!(config.discovery.parallelism, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config = parse_toml(
            r#"
            [project]
            root = "/srv/shop"
            "#,
        );
        assert_eq!(config.project.root, Some(PathBuf::from("/srv/shop")));
        assert_eq!(config.project.php_service, "php-fpm");
    }

    #[test]
    fn test_empty_php_service_rejected() {
        let config = parse_toml(
            r#"
            [project]
            php_service = "  "
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(DockhandError::InvalidConfig(msg)) if msg.contains("php_service"))
        );
    }

    #[test]
    fn test_parallelism_zero_rejected() {
        let config = parse_toml(
            r#"
            [discovery]
            parallelism = 0
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(DockhandError::InvalidConfig(msg)) if msg.contains("parallelism"))
        );
    }

    #[test]
    fn test_parallelism_over_cap_rejected() {
        let config = parse_toml(
            r#"
            [discovery]
            parallelism = 64
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(DockhandError::InvalidConfig(msg)) if msg.contains("parallelism"))
        );
    }

    #[test]
    fn test_port_zero_rejected() {
        let config = parse_toml(
            r#"
            [http]
            port = 0
            "#,
        );
        let result = config.validate();
        assert!(matches!(result, Err(DockhandError::InvalidConfig(msg)) if msg.contains("port")));
    }
}
