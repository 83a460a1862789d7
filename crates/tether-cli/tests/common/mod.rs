#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

/// Run the CLI with an isolated HOME and XDG layout.
pub fn run_cli_with_env(args: &[&str], home: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tether"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("XDG_CACHE_HOME", home.join("cache"));
    cmd.env("XDG_RUNTIME_DIR", home.join("runtime"));
    cmd.env("TETHER_BASE_URL", base_url);
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_with_env_success(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli_with_env(args, home, base_url);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_with_env_failure(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli_with_env(args, home, base_url);
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!("CLI command unexpectedly succeeded: {:?}\nstdout: {}", args, stdout);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn persistent_file(home: &Path) -> PathBuf {
    home.join("data").join("tether").join("tokens.json")
}

pub fn ephemeral_file(home: &Path) -> PathBuf {
    home.join("runtime").join("tether").join("tokens.json")
}

/// An unsigned access token for `username` expiring `ttl` seconds from now.
pub fn access_token(username: &str, is_staff: bool, ttl: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = json!({
        "user_id": 7,
        "username": username,
        "is_staff": is_staff,
        "iat": now,
        "exp": now + ttl,
    });
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// Write a token file the way the CLI's file store lays it out.
pub fn seed_tokens(path: &Path, access: &str, refresh: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        path,
        serde_json::to_string_pretty(&json!({
            "access_token": access,
            "refresh_token": refresh,
        }))
        .unwrap(),
    )
    .unwrap();
}

pub fn stored_access(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value["access_token"].as_str().map(str::to_string)
}
