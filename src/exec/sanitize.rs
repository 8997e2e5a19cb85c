//! Output sanitizer — strips noisy diagnostic lines from captured Magento CLI
//! output before it goes into a tool report.

use regex::Regex;

/// Drop noisy diagnostic lines and trim the remainder.
///
/// Removed, in line order: timestamp-bracket-prefixed log lines, lines
/// carrying the `main.DEBUG` marker, cache-invalidation trace lines, raw JSON
/// request-trace lines, and bare `[]` artifact lines. Retained lines keep
/// their relative order. Idempotent: `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let timestamp_re = Regex::new(r"^\[\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}").expect("valid regex");

    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            if timestamp_re.is_match(trimmed) {
                return false;
            }
            if trimmed.contains("main.DEBUG") {
                return false;
            }
            if trimmed.contains("cache_invalidate") {
                return false;
            }
            if trimmed.starts_with("{\"method\":") {
                return false;
            }
            if trimmed == "[]" {
                return false;
            }
            true
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
