//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the core and the TUI MUST NOT call sleep
//! methods. Waiting happens on I/O, channels, `tokio::time::interval` ticks or
//! timeouts.
//!
//! **Exception**: the session's fixed reconnect delay in `core/src/session.rs`.
//! Test modules are not scanned.

use architectural_enforcement::{production_lines, rust_files, SourceLine, Violation};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nACCEPTABLE sleep uses:");
        eprintln!("  - The reconnect delay in the streaming session");
        eprintln!("  - Test code (#[cfg(test)] modules and tests/ directories)");
        eprintln!("\nUse tokio::time::interval() for periodic work (frame ticks).");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

/// Test that the scan actually looks at something
#[test]
fn test_scan_covers_both_crates() {
    assert!(!rust_files("core/src").is_empty());
    assert!(!rust_files("tui/src").is_empty());
}

fn find_sleep_violations() -> Vec<Violation> {
    let mut violations = Vec::new();

    for dir in ["core/src", "tui/src"] {
        for path in rust_files(dir) {
            let lines = production_lines(&path);
            let reconnect_allowed = path.ends_with("core/src/session.rs");

            for (idx, line) in lines.iter().enumerate() {
                if !is_sleep_call(&line.code) {
                    continue;
                }
                if reconnect_allowed && is_reconnect_delay_context(&lines, idx) {
                    continue;
                }
                violations.push(Violation {
                    path: path.clone(),
                    line: line.number,
                    code: line.code.clone(),
                });
            }
        }
    }

    violations
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Whether a sleep sits next to the reconnect delay it implements
fn is_reconnect_delay_context(lines: &[SourceLine], current_idx: usize) -> bool {
    let start = current_idx.saturating_sub(10);
    let end = (current_idx + 1).min(lines.len());

    lines[start..end]
        .iter()
        .any(|line| line.code.contains("reconnect_delay"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(code: &[&str]) -> Vec<SourceLine> {
        code.iter()
            .enumerate()
            .map(|(idx, line)| SourceLine {
                number: idx + 1,
                code: (*line).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_sleep_detection() {
        assert!(is_sleep_call("    tokio::time::sleep(Duration::from_millis(10)).await;"));
        assert!(is_sleep_call("    std::thread::sleep(d);"));
        assert!(!is_sleep_call("    let mut tick = tokio::time::interval(d);"));
    }

    #[test]
    fn test_reconnect_delay_detection() {
        let code = lines(&[
            "async fn closed(&mut self) -> Phase {",
            "    let delay = self.settings.reconnect_delay;",
            "    let timer = tokio::time::sleep(delay);",
        ]);
        assert!(is_reconnect_delay_context(&code, 2));

        let polling = lines(&[
            "loop {",
            "    poll();",
            "    tokio::time::sleep(Duration::from_millis(10)).await;",
        ]);
        assert!(!is_reconnect_delay_context(&polling, 2));
    }
}
