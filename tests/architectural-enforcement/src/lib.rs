//! Architectural Enforcement Integration Tests
//!
//! Source-scanning tests that keep the concurrency model honest:
//! - No blocking HTTP and no thread sleeps in production code
//! - The headless engine never touches the terminal
//! - The renderer state machine performs no I/O
//!
//! The helpers here are shared by the test files under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the pattern was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The pattern that matched
    pub pattern: String,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - `{}`: {}",
            self.path.display(),
            self.line,
            self.pattern,
            self.text
        )
    }
}

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Production lines of a source file: comments stripped, test module dropped
///
/// Everything from the first `#[cfg(test)]` on is treated as test code.
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .collect()
}

/// Scan one file for any of `patterns`
pub fn scan_file(path: &Path, patterns: &[&str], violations: &mut Vec<Violation>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    for (line, code) in production_lines(&content) {
        for pattern in patterns {
            if code.contains(pattern) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line,
                    pattern: (*pattern).to_string(),
                    text: code.trim().to_string(),
                });
            }
        }
    }
}

/// Scan every `.rs` file under `dir` (relative to the workspace root)
pub fn scan_directory(dir: &str, patterns: &[&str]) -> Vec<Violation> {
    let root = workspace_root().join(dir);
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            scan_file(entry.path(), patterns, &mut violations);
        }
    }

    violations
}

/// Panic with a readable report if there are violations
pub fn assert_clean(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n{rule}\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {rule}",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_skip_comments_and_tests() {
        let source = "use a; // reqwest::blocking\n/// std::thread::sleep\nfn f() {}\n#[cfg(test)]\nmod tests { reqwest::blocking }\n";
        let lines = production_lines(source);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|(_, code)| !code.contains("reqwest")));
        assert!(lines.iter().all(|(_, code)| !code.contains("sleep")));
    }

    #[test]
    fn test_workspace_root_has_members() {
        let root = workspace_root();
        assert!(root.join("engine").join("src").exists());
        assert!(root.join("tui").join("src").exists());
    }
}
