//! Integration Test: Core Layering
//!
//! **Policy**: `gigi-core` is UI-agnostic. It must not depend on ratatui or
//! crossterm, and it must not use blocking HTTP.

use std::fs;

use architectural_enforcement::{production_lines, rust_files, workspace_root, Violation};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("core").join("Cargo.toml"))
        .expect("core/Cargo.toml readable");

    for krate in UI_CRATES {
        assert!(
            !manifest
                .lines()
                .any(|line| line.trim_start().starts_with(krate)),
            "core/Cargo.toml must not depend on {krate}"
        );
    }
}

#[test]
fn test_core_sources_stay_ui_agnostic() {
    let mut violations = Vec::new();

    for path in rust_files("core/src") {
        for line in production_lines(&path) {
            let uses_ui = UI_CRATES
                .iter()
                .any(|krate| line.code.contains(&format!("{krate}::")));
            let blocking_http = line.code.contains("reqwest::blocking");

            if uses_ui || blocking_http {
                violations.push(Violation {
                    path: path.clone(),
                    line: line.number,
                    code: line.code,
                });
            }
        }
    }

    for violation in &violations {
        eprintln!("  {violation}");
    }
    assert!(
        violations.is_empty(),
        "{} layering violation(s) in gigi-core",
        violations.len()
    );
}
