//! Timeout policy for outbound Magento CLI operations.
//!
//! Pure classification with no side effects: commands containing a known
//! slow-operation token get the escalated timeout, everything else the
//! default. The DI compile tool applies its own bespoke budget on top of this
//! (see `tools::platform`).

use std::time::Duration;

/// Default timeout for remote commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Escalated timeout for known slow operations.
pub const ESCALATED_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Bespoke budget for a full DI compile with the memory ceiling disabled.
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Timeout for log tailing — bounded so a tail can never hold an MCP call
/// for the full default budget.
pub const LOGS_TIMEOUT: Duration = Duration::from_secs(60);

/// Operation names that routinely exceed the default timeout.
const SLOW_OPERATIONS: [&str; 4] = [
    "setup:di:compile",
    "setup:static-content:deploy",
    "setup:upgrade",
    "indexer:reindex",
];

/// Classify an outbound command into its timeout bucket.
///
/// Escalates when any argument token matches a slow-operation name.
pub fn timeout_for(args: &[String]) -> Duration {
    if args.iter().any(|a| SLOW_OPERATIONS.contains(&a.as_str())) {
        ESCALATED_TIMEOUT
    } else {
        DEFAULT_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_for_ordinary_commands() {
        assert_eq!(timeout_for(&args(&["cache:clean"])), DEFAULT_TIMEOUT);
        assert_eq!(timeout_for(&args(&["config:show", "web/seo"])), DEFAULT_TIMEOUT);
        assert_eq!(timeout_for(&[]), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_escalates_slow_operations() {
        assert_eq!(timeout_for(&args(&["setup:di:compile"])), ESCALATED_TIMEOUT);
        assert_eq!(timeout_for(&args(&["setup:upgrade"])), ESCALATED_TIMEOUT);
        assert_eq!(timeout_for(&args(&["indexer:reindex"])), ESCALATED_TIMEOUT);
    }

    #[test]
    fn test_marker_position_does_not_matter() {
        assert_eq!(
            timeout_for(&args(&["-v", "setup:static-content:deploy", "en_US"])),
            ESCALATED_TIMEOUT
        );
    }

    #[test]
    fn test_substring_does_not_escalate() {
        // Only whole-token matches count
        assert_eq!(
            timeout_for(&args(&["setup:di:compile-report"])),
            DEFAULT_TIMEOUT
        );
    }
}
