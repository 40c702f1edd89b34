//! Integration Test: Async Discipline
//!
//! Production code runs on two tokio tasks that must never block:
//! the UI loop and the turn dispatcher.
//!
//! **Policy**: no blocking HTTP client and no thread sleeps in `engine/src`
//! or `tui/src`. Use `reqwest::Client` and `tokio::time::sleep` instead.

use architectural_enforcement::{assert_clean, scan_directory};

const PRODUCTION_DIRS: [&str; 2] = ["engine/src", "tui/src"];

#[test]
fn test_no_blocking_http_client() {
    let violations: Vec<_> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| scan_directory(dir, &["reqwest::blocking"]))
        .collect();

    assert_clean("blocking HTTP client in production code", &violations);
}

#[test]
fn test_no_thread_sleep() {
    let violations: Vec<_> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| scan_directory(dir, &["std::thread::sleep", "thread::sleep("]))
        .collect();

    assert_clean("thread sleep in production code", &violations);
}
