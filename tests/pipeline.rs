//! End-to-end runs of the pipeline with a stand-in compiler.

#![cfg(unix)]

use entrytrace::pipeline::{self, Outcome, PipelineOptions};
use entrytrace::PipelineError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("roundtrip")
        .join(name)
}

/// A scratch directory holding a source file, a shell script standing
/// in for the compiler, and a directory for intermediate files.
struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new(script: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cc.sh"), script).unwrap();
        std::fs::write(dir.path().join("input.c"), "int main(void) { return 0; }\n").unwrap();
        std::fs::create_dir(dir.path().join("tmp")).unwrap();
        Harness { dir }
    }

    /// A compiler that copies `fixture` to the path after `-o`.
    fn copying(fixture: &Path) -> Harness {
        Harness::new(&format!(
            "while [ $# -gt 1 ]; do shift; done\ncp '{}' \"$1\"\n",
            fixture.display()
        ))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn opts(&self) -> PipelineOptions {
        PipelineOptions {
            compiler: "sh".to_string(),
            compiler_args: vec![self.path("cc.sh").display().to_string()],
            temp_dir: Some(self.path("tmp")),
            ..PipelineOptions::default()
        }
    }

    fn temp_files(&self) -> usize {
        std::fs::read_dir(self.path("tmp")).unwrap().count()
    }
}

#[test]
fn compiles_instruments_and_writes() {
    let _ = env_logger::try_init();
    let h = Harness::copying(&fixture("target_program.ll"));
    let output = h.path("out.ll");
    let outcome = pipeline::run(&h.path("input.c"), &output, &h.opts()).unwrap();
    assert_eq!(outcome, Outcome::Written { instrumented: 3 });

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.matches("call void @log_function_entry(").count(), 3);
    assert!(text.contains("declare void @log_function_entry(ptr)"));
    assert_eq!(h.temp_files(), 0);
}

#[test]
fn compiler_failure_is_reported() {
    let h = Harness::new("exit 2\n");
    let output = h.path("out.ll");
    let err = pipeline::run(&h.path("input.c"), &output, &h.opts()).unwrap_err();
    match err {
        PipelineError::CompileFailure { code, .. } => assert_eq!(code, Some(2)),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!output.exists());
    assert_eq!(h.temp_files(), 0);
}

#[test]
fn missing_compiler_is_reported() {
    let h = Harness::new("");
    let opts = PipelineOptions {
        compiler: h.path("no-such-compiler").display().to_string(),
        ..h.opts()
    };
    let err = pipeline::run(&h.path("input.c"), &h.path("out.ll"), &opts).unwrap_err();
    assert!(matches!(err, PipelineError::CompilerSpawn { .. }));
    assert_eq!(h.temp_files(), 0);
}

#[test]
fn textual_ir_input_skips_the_compiler() {
    // A compiler that would fail if it were run.
    let h = Harness::new("exit 1\n");
    let input = h.path("program.ll");
    std::fs::copy(fixture("target_program_typed.ll"), &input).unwrap();
    let output = h.path("out.ll");
    let outcome = pipeline::run(&input, &output, &h.opts()).unwrap();
    assert_eq!(outcome, Outcome::Written { instrumented: 3 });
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("declare void @log_function_entry(i8*)"));
}

#[test]
fn pointer_style_override() {
    let h = Harness::copying(&fixture("target_program.ll"));
    let opts = PipelineOptions {
        pointer_style: Some(entrytrace::PointerStyle::Typed),
        ..h.opts()
    };
    let output = h.path("out.ll");
    pipeline::run(&h.path("input.c"), &output, &opts).unwrap();
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("declare void @log_function_entry(i8*)"));
}

#[test]
fn unmodified_module_writes_nothing() {
    let h = Harness::copying(&fixture("log_only.ll"));
    let output = h.path("out.ll");
    let outcome = pipeline::run(&h.path("input.c"), &output, &h.opts()).unwrap();
    assert_eq!(outcome, Outcome::Unmodified);
    assert!(!output.exists());
    assert_eq!(h.temp_files(), 0);
}

#[test]
fn output_open_failure_cleans_up() {
    let h = Harness::copying(&fixture("target_program.ll"));
    let output = h.path("missing-dir").join("out.ll");
    let err = pipeline::run(&h.path("input.c"), &output, &h.opts()).unwrap_err();
    assert!(matches!(err, PipelineError::OutputOpen { .. }));
    assert_eq!(h.temp_files(), 0);
}

#[test]
fn parse_failure_names_the_file() {
    let h = Harness::new("while [ $# -gt 1 ]; do shift; done\nprintf 'define void @f() {\\n  ret void\\n' > \"$1\"\n");
    let err = pipeline::run(&h.path("input.c"), &h.path("out.ll"), &h.opts()).unwrap_err();
    match &err {
        PipelineError::Parse(parse) => {
            let path = parse.path.as_ref().unwrap();
            assert!(path.starts_with(h.path("tmp")));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(h.temp_files(), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn output_write_failure_is_reported() {
    let h = Harness::copying(&fixture("target_program.ll"));
    let output = Path::new("/dev/full");
    let err = pipeline::run(&h.path("input.c"), output, &h.opts()).unwrap_err();
    match &err {
        PipelineError::OutputWrite { path, .. } => assert_eq!(path.as_path(), output),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(h.temp_files(), 0);
}
