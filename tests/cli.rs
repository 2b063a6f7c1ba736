//! Exit codes and files left behind by the `entrytrace` binary.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("roundtrip")
        .join(name)
}

/// Run the binary with `sh <script>` as its compiler, inside a fresh
/// scratch directory.
fn entrytrace(script: &str, extra: &[&str]) -> (TempDir, Output) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cc.sh"), script).unwrap();
    std::fs::write(dir.path().join("input.c"), "int main(void) { return 0; }\n").unwrap();
    std::fs::create_dir(dir.path().join("tmp")).unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_entrytrace"))
        .arg("--cc")
        .arg("sh")
        .arg("--cflag")
        .arg(dir.path().join("cc.sh"))
        .arg("--temp-dir")
        .arg(dir.path().join("tmp"))
        .args(extra)
        .arg(dir.path().join("input.c"))
        .arg(dir.path().join("out.ll"))
        .output()
        .unwrap();
    (dir, output)
}

fn copying(fixture: &Path) -> String {
    format!(
        "while [ $# -gt 1 ]; do shift; done\ncp '{}' \"$1\"\n",
        fixture.display()
    )
}

fn temp_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("tmp")).unwrap().count()
}

#[test]
fn compiler_failure_exits_with_one() {
    let (dir, output) = entrytrace("exit 2\n", &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exit code 2"), "{}", stderr);
    assert!(!dir.path().join("out.ll").exists());
    assert_eq!(temp_files(&dir), 0);
}

#[test]
fn unmodified_module_exits_with_zero() {
    let (dir, output) = entrytrace(&copying(&fixture("log_only.ll")), &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(!dir.path().join("out.ll").exists());
    assert_eq!(temp_files(&dir), 0);
}

#[test]
fn instrumented_module_is_written() {
    let (dir, output) = entrytrace(
        &copying(&fixture("target_program.ll")),
        &["--before-allocas", "--exclude", "main"],
    );
    assert_eq!(output.status.code(), Some(0));
    let text = std::fs::read_to_string(dir.path().join("out.ll")).unwrap();
    assert!(text.contains(
        "define dso_local void @bar(i32 noundef %0) #0 {\n  call void @log_function_entry(ptr @.str.entry)\n"
    ));
    assert_eq!(text.matches("call void @log_function_entry(").count(), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Instrumented function: foo"));
    assert_eq!(temp_files(&dir), 0);
}
