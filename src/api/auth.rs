//! Punchin authentication: a two-step cookie handshake executed through the
//! remote channel.
//!
//! The cookie jar is a plain file inside the container. Reused sessions share
//! one fixed per-host path, so concurrent authenticated calls against the
//! same host can interleave jar writes (last write wins). Acceptable for a
//! single cooperative operator; ephemeral jars avoid it entirely.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;

use crate::exec::policy;
use crate::exec::RemoteChannel;

const TOKEN_ENDPOINT: &str = "/rest/V1/lvapi/gettoken";

/// Fixed per-host jar path used when the caller asks for session reuse.
pub fn reusable_jar_path(host: &str) -> String {
    format!("/tmp/dockhand-cookies-{}.txt", host)
}

fn ephemeral_jar_path(host: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    format!("/tmp/dockhand-cookies-{}-{}.txt", host, nanos)
}

/// Perform the punchin handshake and return the extra curl args that carry
/// the session, `["-b", <jar>]`, or an empty list when the token exchange
/// fails and the caller should proceed unauthenticated.
///
/// Step one posts the credential XML to the token endpoint with cookies
/// persisted to the jar. Inline XML travels as a base64 one-liner that
/// materializes /tmp/punchin.xml inside the container first; without inline
/// content the remote /tmp/punchin.xml is referenced as-is. Step two scans
/// the response for a `<URL>` marker and issues a best-effort GET against its
/// path component through the same jar; that result is not inspected.
pub async fn punchin_cookie_args(
    channel: &dyn RemoteChannel,
    service: &str,
    base_url: &str,
    host_header: &str,
    punchin_xml: Option<&str>,
    cookie_path: Option<&str>,
) -> Vec<String> {
    let jar = match cookie_path {
        Some(path) => path.to_string(),
        None => ephemeral_jar_path(host_header),
    };
    let token_url = format!("{}{}", base_url, TOKEN_ENDPOINT);

    let exchanged = match punchin_xml {
        Some(xml) => {
            let encoded = STANDARD.encode(xml.as_bytes());
            let script = format!(
                "echo '{encoded}' | base64 -d > /tmp/punchin.xml && \
                 curl -s -L -c {jar} -b {jar} \
                 -H 'Content-Type: application/xml' -H 'Host: {host}' \
                 --data-binary @/tmp/punchin.xml {url}",
                encoded = encoded,
                jar = jar,
                host = host_header,
                url = token_url,
            );
            let argv = vec!["bash".to_string(), "-lc".to_string(), script];
            channel.execute(service, &argv, policy::DEFAULT_TIMEOUT).await
        }
        None => {
            let argv = vec![
                "curl".to_string(),
                "-s".to_string(),
                "-L".to_string(),
                "-c".to_string(),
                jar.clone(),
                "-b".to_string(),
                jar.clone(),
                "-H".to_string(),
                "Content-Type: application/xml".to_string(),
                "-H".to_string(),
                format!("Host: {}", host_header),
                "--data-binary".to_string(),
                "@/tmp/punchin.xml".to_string(),
                token_url,
            ];
            channel.execute(service, &argv, policy::DEFAULT_TIMEOUT).await
        }
    };

    if !exchanged.success {
        tracing::debug!(host = %host_header, "punchin token exchange failed, proceeding unauthenticated");
        return Vec::new();
    }

    let url_re = Regex::new(r"<URL>(https?://[^<]*)</URL>").expect("valid regex");
    if let Some(found) = url_re.captures(&exchanged.stdout) {
        let path_re = Regex::new(r"^https?://[^/]+(/.*)$").expect("valid regex");
        let path_only = path_re
            .captures(&found[1])
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "/".to_string());
        let session_argv = vec![
            "curl".to_string(),
            "-s".to_string(),
            "-L".to_string(),
            "-c".to_string(),
            jar.clone(),
            "-b".to_string(),
            jar.clone(),
            "-H".to_string(),
            format!("Host: {}", host_header),
            format!("{}{}", base_url, path_only),
        ];
        let _ = channel.execute(service, &session_argv, policy::DEFAULT_TIMEOUT).await;
    }

    vec!["-b".to_string(), jar]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{err_result, ok_result, ChannelCall, ScriptedChannel};

    const TOKEN_RESPONSE: &str = r#"<?xml version="1.0"?>
<cXML><Response><Status code="200" text="OK"/>
<PunchOutSetupResponse><StartPage>
<URL>http://app.shop.test/punchin/session/start?sid=abc123</URL>
</StartPage></PunchOutSetupResponse></Response></cXML>"#;

    #[tokio::test]
    async fn test_handshake_returns_jar_args_and_follows_start_url() {
        let channel = ScriptedChannel::new(|_, _| ok_result(TOKEN_RESPONSE));
        let args = punchin_cookie_args(
            &channel,
            "php-fpm",
            "http://nginx",
            "app.shop.test",
            None,
            Some("/tmp/jar.txt"),
        )
        .await;

        assert_eq!(args, vec!["-b".to_string(), "/tmp/jar.txt".to_string()]);

        let calls = channel.calls();
        assert_eq!(calls.len(), 2);

        let ChannelCall::Exec { argv: token_argv, .. } = &calls[0] else {
            panic!("expected exec call");
        };
        assert_eq!(token_argv[0], "curl");
        assert!(token_argv.contains(&"--data-binary".to_string()));
        assert!(token_argv.contains(&"@/tmp/punchin.xml".to_string()));
        assert_eq!(
            token_argv.last().map(String::as_str),
            Some("http://nginx/rest/V1/lvapi/gettoken")
        );

        let ChannelCall::Exec { argv: session_argv, .. } = &calls[1] else {
            panic!("expected exec call");
        };
        assert_eq!(
            session_argv.last().map(String::as_str),
            Some("http://nginx/punchin/session/start?sid=abc123")
        );
        assert!(session_argv.contains(&"Host: app.shop.test".to_string()));
    }

    #[tokio::test]
    async fn test_handshake_inline_xml_travels_base64() {
        let channel = ScriptedChannel::new(|_, _| ok_result(""));
        let xml = "<cXML><Header/></cXML>";
        punchin_cookie_args(
            &channel,
            "php-fpm",
            "http://nginx",
            "shop.test",
            Some(xml),
            Some("/tmp/jar.txt"),
        )
        .await;

        let argvs = channel.exec_argvs();
        assert_eq!(argvs.len(), 1);
        assert_eq!(argvs[0][0], "bash");
        assert_eq!(argvs[0][1], "-lc");
        let script = &argvs[0][2];
        assert!(script.contains(&STANDARD.encode(xml.as_bytes())));
        assert!(script.contains("base64 -d > /tmp/punchin.xml"));
        assert!(script.contains("-c /tmp/jar.txt -b /tmp/jar.txt"));
    }

    #[tokio::test]
    async fn test_handshake_failure_returns_no_args() {
        let channel = ScriptedChannel::always(err_result("connection refused"));
        let args = punchin_cookie_args(
            &channel,
            "php-fpm",
            "http://nginx",
            "shop.test",
            None,
            None,
        )
        .await;
        assert!(args.is_empty());
        assert_eq!(channel.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_handshake_without_start_url_still_returns_jar() {
        let channel = ScriptedChannel::new(|_, _| ok_result("<cXML><Response/></cXML>"));
        let args = punchin_cookie_args(
            &channel,
            "php-fpm",
            "http://nginx",
            "shop.test",
            None,
            Some("/tmp/jar.txt"),
        )
        .await;
        assert_eq!(args, vec!["-b".to_string(), "/tmp/jar.txt".to_string()]);
        assert_eq!(channel.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_ephemeral_jars_are_unique_per_call() {
        let channel = ScriptedChannel::new(|_, _| ok_result(""));
        let first =
            punchin_cookie_args(&channel, "php-fpm", "http://nginx", "shop.test", None, None)
                .await;
        let second =
            punchin_cookie_args(&channel, "php-fpm", "http://nginx", "shop.test", None, None)
                .await;

        assert!(first[1].starts_with("/tmp/dockhand-cookies-shop.test-"));
        assert_ne!(first[1], second[1]);
    }

    #[test]
    fn test_reusable_jar_path_is_host_keyed() {
        assert_eq!(
            reusable_jar_path("app.shop.test"),
            "/tmp/dockhand-cookies-app.shop.test.txt"
        );
    }
}
