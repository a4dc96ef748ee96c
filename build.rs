// Build script - runs at compile time
use std::process::Command;

fn main() {
    // Get git commit hash (short)
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let commit = commit.trim();

    // Pass to compiler as environment variable, logged by the demo at startup
    println!("cargo:rustc-env=BUILD_COMMIT={}", commit);
}
