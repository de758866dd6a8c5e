//! Shared test utilities for integration tests
//!
//! Provides common fixture creation and helper functions
//! used across multiple test files.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Small mixed project: sources, an ignored build dir, a lockfile
/// and an ignore file with a negation.
pub fn make_project() -> assert_fs::TempDir
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("src/main.rs")
        .write_str("fn main() {\n    println!(\"hi\");\n}\n")
        .expect("write main.rs");

    tmp.child("src/util/mod.rs")
        .write_str("pub fn helper() {}\n")
        .expect("write mod.rs");

    tmp.child("README.md")
        .write_str("# Demo\n\nSome context here.\n")
        .expect("write readme");

    // One log is re-included by the negation below
    tmp.child("logs/a.log")
        .write_str("noise\n")
        .expect("write a.log");

    tmp.child("logs/keep.log")
        .write_str("important\n")
        .expect("write keep.log");

    // Built-in denylist entries
    tmp.child("build/out.txt")
        .write_str("artifact\n")
        .expect("write build output");

    tmp.child("package-lock.json")
        .write_str("{}\n")
        .expect("write lockfile");

    tmp.child(".gitignore")
        .write_str("*.log\n!keep.log\n")
        .expect("write .gitignore");

    tmp
}

/// `count` one-line text files spread over a few directories
pub fn make_wide_fixture(count: usize) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    for i in 0..count
    {
        tmp.child(format!("pkg_{}/file_{i:03}.txt", i % 5))
            .write_str(&format!("content {i}\n"))
            .expect("write");
    }

    tmp
}
