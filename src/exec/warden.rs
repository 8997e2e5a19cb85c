//! Warden-backed channel and the `bin/magento` runner built on top of it.
//!
//! Every remote operation becomes a `warden` invocation rooted at the project
//! directory; the warden CLI owns container resolution and dockhand only
//! assembles argv. `-T` disables TTY allocation so output stays pipeable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::exec::runner::{self, RunResult};
use crate::exec::{policy, RemoteChannel};

/// Default php flags for `bin/magento` invocations. Magento's compile and
/// deploy commands routinely blow through the container's memory_limit.
pub const MAGENTO_PHP_FLAGS: [&str; 2] = ["-d", "memory_limit=-1"];

/// Production [`RemoteChannel`] that shells out to `warden env exec`.
#[derive(Debug, Clone)]
pub struct WardenChannel {
    project_root: PathBuf,
}

impl WardenChannel {
    pub fn new(project_root: PathBuf) -> Self {
        WardenChannel { project_root }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[async_trait]
impl RemoteChannel for WardenChannel {
    async fn execute(&self, service: &str, argv: &[String], timeout: Duration) -> RunResult {
        let args = exec_argv(service, argv);
        runner::run("warden", &args, &self.project_root, timeout, &HashMap::new()).await
    }

    async fn logs_tail(&self, services: &[String], tail_lines: u32) -> RunResult {
        let args = logs_argv(services, tail_lines);
        runner::run(
            "warden",
            &args,
            &self.project_root,
            policy::LOGS_TIMEOUT,
            &HashMap::new(),
        )
        .await
    }
}

fn exec_argv(service: &str, argv: &[String]) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "env".to_string(),
        "exec".to_string(),
        "-T".to_string(),
        service.to_string(),
    ];
    args.extend(argv.iter().cloned());
    args
}

fn logs_argv(services: &[String], tail_lines: u32) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "env".to_string(),
        "logs".to_string(),
        "--tail".to_string(),
        tail_lines.to_string(),
    ];
    args.extend(services.iter().cloned());
    args
}

/// Run `bin/magento <args>` inside the php service with the default php flags
/// and the timeout the command policy assigns to the operation.
pub async fn run_magento(
    channel: &dyn RemoteChannel,
    php_service: &str,
    magento_args: &[String],
) -> RunResult {
    let php_flags: Vec<String> = MAGENTO_PHP_FLAGS.iter().map(|s| s.to_string()).collect();
    let timeout = policy::timeout_for(magento_args);
    run_magento_with(channel, php_service, magento_args, &php_flags, timeout).await
}

/// Run `bin/magento` with explicit php flags and timeout. The DI compile tool
/// uses this for its bespoke budget.
pub async fn run_magento_with(
    channel: &dyn RemoteChannel,
    php_service: &str,
    magento_args: &[String],
    php_flags: &[String],
    timeout: Duration,
) -> RunResult {
    let mut argv: Vec<String> = vec!["php".to_string()];
    argv.extend(php_flags.iter().cloned());
    argv.push("bin/magento".to_string());
    argv.extend(magento_args.iter().cloned());
    channel.execute(php_service, &argv, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ok_result, ChannelCall, ScriptedChannel};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exec_argv_shape() {
        let args = exec_argv("redis", &strings(&["redis-cli", "flushall"]));
        assert_eq!(
            args,
            strings(&["env", "exec", "-T", "redis", "redis-cli", "flushall"])
        );
    }

    #[test]
    fn test_logs_argv_shape() {
        let args = logs_argv(&strings(&["nginx", "php-fpm"]), 50);
        assert_eq!(
            args,
            strings(&["env", "logs", "--tail", "50", "nginx", "php-fpm"])
        );
    }

    #[tokio::test]
    async fn test_run_magento_argv_and_default_timeout() {
        let channel = ScriptedChannel::new(|_, _| ok_result("Cleaned cache types"));
        let res = run_magento(&channel, "php-fpm", &strings(&["cache:clean", "config"])).await;
        assert!(res.success);

        let calls = channel.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            ChannelCall::Exec {
                service: "php-fpm".to_string(),
                argv: strings(&[
                    "php",
                    "-d",
                    "memory_limit=-1",
                    "bin/magento",
                    "cache:clean",
                    "config",
                ]),
                timeout: policy::DEFAULT_TIMEOUT,
            }
        );
    }

    #[tokio::test]
    async fn test_run_magento_escalates_slow_operations() {
        let channel = ScriptedChannel::new(|_, _| ok_result(""));
        run_magento(&channel, "php-fpm", &strings(&["setup:upgrade"])).await;

        match &channel.calls()[0] {
            ChannelCall::Exec { timeout, .. } => {
                assert_eq!(*timeout, policy::ESCALATED_TIMEOUT)
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_magento_with_honors_explicit_timeout() {
        let channel = ScriptedChannel::new(|_, _| ok_result(""));
        let flags = strings(&["-d", "memory_limit=-1"]);
        run_magento_with(
            &channel,
            "php-fpm",
            &strings(&["setup:di:compile"]),
            &flags,
            policy::COMPILE_TIMEOUT,
        )
        .await;

        match &channel.calls()[0] {
            ChannelCall::Exec { timeout, argv, .. } => {
                assert_eq!(*timeout, policy::COMPILE_TIMEOUT);
                assert_eq!(argv[4], "setup:di:compile");
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }
}
