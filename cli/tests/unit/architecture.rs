//! Structural tests for layer boundaries.
//!
//! These scan source files so the domain stays pure and services only talk
//! to the outside world through ports.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().starts_with("#[cfg(") && line.contains("test") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment production lines of every file under `src/<layer>`, as
/// `(relative path, line number, line)`.
fn production_lines(layer: &str) -> Vec<(String, usize, String)> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut out = Vec::new();
    for file in collect_rs_files(&root.join("src").join(layer)) {
        let rel = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if rel.ends_with("/tests.rs") {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.is_empty() {
                continue;
            }
            out.push((rel.clone(), i + 1, line.to_string()));
        }
    }
    out
}

fn assert_absent(layer: &str, forbidden: &[&str], why: &str) {
    let violations: Vec<String> = production_lines(layer)
        .into_iter()
        .filter(|(_, _, line)| forbidden.iter().any(|f| line.contains(f)))
        .map(|(rel, n, line)| format!("{rel}:{n}: {}", line.trim()))
        .collect();
    assert!(
        violations.is_empty(),
        "{why}:\n{}",
        violations.join("\n")
    );
}

#[test]
fn domain_performs_no_io() {
    assert_absent(
        "domain",
        &[
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
            "reqwest",
            "println!",
        ],
        "domain must stay pure",
    );
}

#[test]
fn domain_does_not_import_outer_layers() {
    assert_absent(
        "domain",
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
        ],
        "domain must not depend on outer layers",
    );
}

#[test]
fn application_only_uses_ports() {
    assert_absent(
        "application",
        &[
            "crate::infra",
            "crate::commands",
            "crate::output",
            "reqwest",
            "std::process::Command",
        ],
        "services must reach the outside world through ports",
    );
}

#[test]
fn infra_does_not_print() {
    assert_absent(
        "infra",
        &["println!", "eprintln!", "crate::output", "crate::commands"],
        "infra reports through tracing, not the terminal",
    );
}

#[test]
fn no_unwrap_in_production_code() {
    for layer in ["domain", "application", "infra", "commands"] {
        assert_absent(
            layer,
            &[".unwrap()", ".expect("],
            "propagate errors instead of panicking",
        );
    }
}
