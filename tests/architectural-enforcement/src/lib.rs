//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code outside the reconnect delay
//! - The core crate stays free of UI dependencies
//!
//! The helpers here locate the workspace and walk its production sources.
//! Anything after a `#[cfg(test)]` line is treated as test code.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// One line of production code with comments stripped
#[derive(Clone, Debug)]
pub struct SourceLine {
    /// 1-based line number
    pub number: usize,
    /// Code before any `//`
    pub code: String,
}

/// Production lines of a source file
///
/// Stops at the first `#[cfg(test)]`; returns nothing if the file can't be read.
#[must_use]
pub fn production_lines(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| SourceLine {
            number: idx + 1,
            code: strip_comment(line).to_string(),
        })
        .collect()
}

/// Code part of a line, ignoring `//` comments (including doc comments)
///
/// A `//` inside a string literal, such as a URL, is kept.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let mut prev_slash = false;

    for (idx, c) in line.char_indices() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            // '"' char literal
            '"' if line[..idx].ends_with('\'') && line[idx + 1..].starts_with('\'') => {
                prev_slash = false;
            }
            '"' => {
                in_string = true;
                prev_slash = false;
            }
            '/' if prev_slash => return &line[..idx - 1],
            '/' => prev_slash = true,
            _ => prev_slash = false,
        }
    }
    line
}

/// A rule broken at a specific line
#[derive(Clone, Debug)]
pub struct Violation {
    /// File that broke the rule
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending code
    pub code: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = workspace_root();
        let shown = self.path.strip_prefix(&root).unwrap_or(&self.path);
        write!(f, "{}:{} - {}", shown.display(), self.line, self.code.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_members() {
        let root = workspace_root();
        assert!(root.join("core").join("Cargo.toml").exists());
        assert!(root.join("tui").join("Cargo.toml").exists());
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("let x = 1; // note"), "let x = 1; ");
        assert_eq!(strip_comment("/// docs"), "");
    }

    #[test]
    fn test_strip_comment_keeps_urls_in_strings() {
        let line = r#"connect("ws://host"); std::thread::sleep(d); // later"#;
        assert_eq!(
            strip_comment(line),
            r#"connect("ws://host"); std::thread::sleep(d); "#
        );
        assert_eq!(strip_comment(r#"let s = "a\"//b"; // c"#), r#"let s = "a\"//b"; "#);
        assert_eq!(strip_comment(r#"if c == '"' { x } // quote"#), r#"if c == '"' { x } "#);
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let dir = std::env::temp_dir().join("gigi-arch-test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(&file, "fn a() {}\n#[cfg(test)]\nmod tests { fn b() {} }\n").unwrap();

        let lines = production_lines(&file);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 1);
    }
}
