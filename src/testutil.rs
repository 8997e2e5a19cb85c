//! Test doubles shared across module tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::exec::runner::RunResult;
use crate::exec::RemoteChannel;
use crate::tools::ToolContext;

/// One recorded call against a [`ScriptedChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Exec {
        service: String,
        argv: Vec<String>,
        timeout: Duration,
    },
    LogsTail {
        services: Vec<String>,
        tail_lines: u32,
    },
}

/// Scripted [`RemoteChannel`]: records every call and answers from a
/// responder closure keyed on the service and argv.
pub struct ScriptedChannel {
    calls: Mutex<Vec<ChannelCall>>,
    responder: Box<dyn Fn(&str, &[String]) -> RunResult + Send + Sync>,
}

impl ScriptedChannel {
    pub fn new(responder: impl Fn(&str, &[String]) -> RunResult + Send + Sync + 'static) -> Self {
        ScriptedChannel {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Channel that answers every call with the same result.
    pub fn always(result: RunResult) -> Self {
        ScriptedChannel::new(move |_, _| result.clone())
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Exec argv vectors only, in call order.
    pub fn exec_argvs(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::Exec { argv, .. } => Some(argv),
                ChannelCall::LogsTail { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteChannel for ScriptedChannel {
    async fn execute(&self, service: &str, argv: &[String], timeout: Duration) -> RunResult {
        self.calls.lock().expect("calls lock").push(ChannelCall::Exec {
            service: service.to_string(),
            argv: argv.to_vec(),
            timeout,
        });
        (self.responder)(service, argv)
    }

    async fn logs_tail(&self, services: &[String], tail_lines: u32) -> RunResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push(ChannelCall::LogsTail {
                services: services.to_vec(),
                tail_lines,
            });
        (self.responder)("logs", services)
    }
}

/// Successful result carrying the given stdout.
pub fn ok_result(stdout: &str) -> RunResult {
    RunResult {
        success: true,
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
        duration_ms: 1,
    }
}

/// Failed result carrying the given stderr.
pub fn err_result(stderr: &str) -> RunResult {
    RunResult {
        success: false,
        exit_code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
        duration_ms: 1,
    }
}

/// [`ToolContext`] rooted at a throwaway Warden project whose .env names the
/// environment `proj` with a traefik vhost at `app.proj.test`.
pub fn test_context(channel: Arc<ScriptedChannel>) -> (ToolContext, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join(".env"),
        "WARDEN_ENV_NAME=proj\nTRAEFIK_DOMAIN=proj.test\nTRAEFIK_SUBDOMAIN=app\n",
    )
    .expect("write .env");

    let context = ToolContext {
        project_root: dir.path().to_path_buf(),
        channel,
        php_service: "php-fpm".to_string(),
        discovery_parallelism: 4,
        punchin_xml_path: None,
    };
    (context, dir)
}
