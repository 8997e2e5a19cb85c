//! Remote execution layer: process spawning with timeout-kill, the timeout
//! policy for Magento CLI operations, output sanitization, and the Warden
//! channel into the container environment.

pub mod policy;
pub mod runner;
pub mod sanitize;
pub mod warden;

use std::time::Duration;

use async_trait::async_trait;

use crate::exec::runner::RunResult;

/// Channel into the containerized environment.
///
/// All remote interaction funnels through this trait — tools never spawn
/// processes directly. The production implementation is
/// [`warden::WardenChannel`]; tests substitute a scripted double that records
/// calls and replays canned results.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Run `argv` inside the named service container.
    ///
    /// Never fails: spawn errors, timeouts, and non-zero exits all resolve
    /// to a `RunResult` value.
    async fn execute(&self, service: &str, argv: &[String], timeout: Duration) -> RunResult;

    /// Tail the last `tail_lines` log lines for the given services (no follow).
    async fn logs_tail(&self, services: &[String], tail_lines: u32) -> RunResult;
}
