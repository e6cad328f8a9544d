//! Stamps the binary with `GIT_COMMIT_HASH` and `BUILD_TIMESTAMP` so a run
//! log names the exact build that produced it.

use std::process::Command;

/// Stdout of a git invocation, `None` outside a checkout or without git
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Short hash of HEAD, suffixed `-dirty` when the tree has local edits
fn commit_stamp() -> String {
    match git(&["rev-parse", "--short", "HEAD"]).filter(|hash| !hash.is_empty()) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|status| !status.is_empty());
            if dirty {
                format!("{}-dirty", hash)
            } else {
                hash
            }
        }
        None => "unknown".to_string(),
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit_stamp());
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    println!("cargo:rerun-if-changed=build.rs");
    if let Some(head) = git(&["rev-parse", "--git-path", "HEAD"]) {
        println!("cargo:rerun-if-changed={}", head);
    }
}
