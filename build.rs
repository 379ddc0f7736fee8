//! Computes the CLI version string at build time.
//!
//! Tagged release builds report the crate version; everything else reports
//! `dev@<short hash>` (or `dev@unknown` outside a git checkout).

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let version = if git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some() {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_default()
    } else {
        match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) if !hash.is_empty() => format!("dev@{hash}"),
            _ => "dev@unknown".to_string(),
        }
    };

    println!("cargo:rustc-env=UPLOAD_PIPELINE_VERSION={version}");
}
