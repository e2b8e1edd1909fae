// Build script for CalcDesk Desktop
// Configures Tauri build process and exposes version information

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=PACKAGE_VERSION");
    println!("cargo:rerun-if-env-changed=FILE_VERSION");

    let (package_version, file_version, build_info) = generate_version_info();

    println!("cargo:rustc-env=PACKAGE_VERSION={}", package_version);
    println!("cargo:rustc-env=FILE_VERSION={}", file_version);
    println!("cargo:rustc-env=BUILD_INFO={}", build_info);

    tauri_build::build();
}

fn generate_version_info() -> (String, String, String) {
    if let (Ok(pkg_ver), Ok(file_ver)) = (
        std::env::var("PACKAGE_VERSION"),
        std::env::var("FILE_VERSION"),
    ) {
        let build_info = format!("{}+ci", file_ver);
        return (pkg_ver, file_ver, build_info);
    }

    let base_version = git(&["describe", "--tags", "--abbrev=0", "--match", "v[0-9]*"])
        .map(|s| s.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let commit_count = git(&["rev-list", "--count", "HEAD"]).unwrap_or_else(|| "0".to_string());
    let commit_hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());

    let file_version = format!("{}.{}", base_version, commit_count);
    let build_info = format!("{}+build.{}.{}", base_version, commit_count, commit_hash);
    (base_version, file_version, build_info)
}

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}
