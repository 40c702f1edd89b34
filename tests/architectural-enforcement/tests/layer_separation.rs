//! Integration Test: Layer Separation
//!
//! - `engine/src` is headless: no terminal crates.
//! - `tui/src` talks to the model only through the engine: no HTTP client.
//! - `tui/src/state.rs` is a pure transition function: no network, no
//!   terminal, no runtime.

use std::path::Path;

use architectural_enforcement::{assert_clean, scan_directory, scan_file, workspace_root};

#[test]
fn test_engine_is_headless() {
    let violations = scan_directory("engine/src", &["ratatui", "crossterm"]);
    assert_clean("terminal dependency in the engine", &violations);
}

#[test]
fn test_tui_has_no_http_client() {
    let violations = scan_directory("tui/src", &["reqwest"]);
    assert_clean("direct HTTP use in the TUI", &violations);
}

#[test]
fn test_renderer_state_is_pure() {
    let path = workspace_root().join(Path::new("tui/src/state.rs"));
    assert!(path.exists(), "missing {}", path.display());

    let mut violations = Vec::new();
    scan_file(
        &path,
        &[
            "reqwest",
            "tokio::net",
            "std::net",
            "crossterm",
            "ratatui",
            "tokio::",
        ],
        &mut violations,
    );

    assert_clean("I/O or terminal dependency in the renderer state", &violations);
}
