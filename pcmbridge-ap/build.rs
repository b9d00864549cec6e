//! Build script for pcmbridge-ap
//!
//! Exposes build identification to the startup banner as compile-time
//! environment variables (`PCMBRIDGE_GIT_HASH`, `PCMBRIDGE_BUILD_TIMESTAMP`,
//! `PCMBRIDGE_BUILD_PROFILE`).

use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Short commit hash, with a `-dirty` suffix for uncommitted changes
fn git_revision() -> Option<String> {
    let run = |args: &[&str]| {
        Command::new("git")
            .args(args)
            .output()
            .ok()
            .filter(|output| output.status.success())
    };

    let hash = run(&["rev-parse", "--short=8", "HEAD"])
        .and_then(|output| String::from_utf8(output.stdout).ok())?;
    let hash = hash.trim();

    let dirty = run(&["status", "--porcelain", "--untracked-files=no"])
        .map_or(false, |output| !output.stdout.is_empty());

    Some(if dirty {
        format!("{}-dirty", hash)
    } else {
        hash.to_string()
    })
}

fn main() {
    let build_info = [
        ("PCMBRIDGE_GIT_HASH", git_revision().unwrap_or_else(|| UNKNOWN.to_string())),
        (
            "PCMBRIDGE_BUILD_TIMESTAMP",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
        (
            "PCMBRIDGE_BUILD_PROFILE",
            std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()),
        ),
    ];

    for (key, value) in build_info {
        println!("cargo:rustc-env={}={}", key, value);
    }

    // Re-run on commit or checkout; the workspace root holds .git
    for path in ["../.git/HEAD", "../.git/index"] {
        println!("cargo:rerun-if-changed={}", path);
    }
}
