//! Common test utilities for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a configuration document into `dir` and return its path
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("crowdsec-custom-bouncer.yaml");
    fs::write(&path, contents).expect("Failed to write config");
    path
}

/// Create an executable-looking file to use as `bin_path`
pub fn fake_binary(dir: &Path) -> PathBuf {
    let path = dir.join("custom-ban.sh");
    fs::write(&path, "#!/bin/sh\nexit 0\n").expect("Failed to write binary");
    path
}

/// Minimal valid document for `bin_path` in the given log mode
pub fn base_config(bin_path: &Path, log_mode: &str) -> String {
    format!("bin_path: {}\nlog_mode: {log_mode}\n", bin_path.display())
}
