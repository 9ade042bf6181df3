//! Stamps the binary with the values reported by `GET /status`.
//!
//! BEEFWEB_BRIDGE_VERSION and BEEFWEB_BRIDGE_GIT_SHA may be set by the
//! release pipeline; otherwise the package version and `git rev-parse` are used.

use std::process::Command;

const VERSION_VAR: &str = "BEEFWEB_BRIDGE_VERSION";
const GIT_SHA_VAR: &str = "BEEFWEB_BRIDGE_GIT_SHA";

fn main() {
    let version = std::env::var(VERSION_VAR)
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    let git_sha = std::env::var(GIT_SHA_VAR)
        .ok()
        .or_else(short_head)
        .unwrap_or_else(|| "unknown".to_string());

    for (var, value) in [(VERSION_VAR, version), (GIT_SHA_VAR, git_sha)] {
        println!("cargo:rustc-env={}={}", var, value);
        println!("cargo:rerun-if-env-changed={}", var);
    }
}

fn short_head() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?;
    Some(sha.trim().to_string()).filter(|s| !s.is_empty())
}
