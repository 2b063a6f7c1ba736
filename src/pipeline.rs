//! The compile / instrument / emit pipeline behind the command-line
//! tool.

use crate::errors::PipelineError;
use crate::ir::{Module, PointerStyle};
use crate::passes::entry_trace::{self, EntryTraceOptions};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempPath;

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Front-end compiler that lowers source to textual IR.
    pub compiler: String,
    /// Arguments passed to the compiler ahead of
    /// `-S -emit-llvm <input> -o <temp>`.
    pub compiler_args: Vec<String>,
    /// Where the intermediate IR file is created; the system temp dir
    /// if unset.
    pub temp_dir: Option<PathBuf>,
    /// Overrides the pointer spelling detected from the IR.
    pub pointer_style: Option<PointerStyle>,
    pub trace: EntryTraceOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            compiler: "clang".to_string(),
            compiler_args: vec![],
            temp_dir: None,
            pointer_style: None,
            trace: EntryTraceOptions::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The output file was written with this many functions
    /// instrumented.
    Written { instrumented: usize },
    /// Nothing was instrumented; no output was written.
    Unmodified,
}

/// Inputs already in textual IR skip the compile step.
fn is_ir_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("ll")
}

/// Compile (unless already IR), instrument, and write `output` if
/// anything changed. The intermediate file is removed on every path
/// out of this function.
pub fn run(input: &Path, output: &Path, opts: &PipelineOptions) -> Result<Outcome, PipelineError> {
    let temp;
    let ir_path = if is_ir_file(input) {
        input
    } else {
        temp = temp_ir_path(opts)?;
        compile(input, &temp, opts)?;
        &*temp
    };

    let mut module = load_module(ir_path, opts)?;
    let report = entry_trace::run(&mut module, &opts.trace);
    debug!(
        "entry_trace: {} instrumented, {} skipped, {} conflicts",
        report.instrumented.len(),
        report.skipped.len(),
        report.conflicts.len()
    );

    if !report.modified() {
        info!("No functions were instrumented; module was not modified.");
        return Ok(Outcome::Unmodified);
    }

    write_module(&module, output)?;
    info!("Instrumented IR written to: {}", output.display());
    Ok(Outcome::Written {
        instrumented: report.instrumented.len(),
    })
}

fn temp_ir_path(opts: &PipelineOptions) -> Result<TempPath, PipelineError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("entrytrace-").suffix(".ll");
    let file = match &opts.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(PipelineError::TempFile)?;
    Ok(file.into_temp_path())
}

/// Run the front-end compiler, blocking until it exits.
pub fn compile(input: &Path, ir_out: &Path, opts: &PipelineOptions) -> Result<(), PipelineError> {
    let mut command = Command::new(&opts.compiler);
    command
        .args(&opts.compiler_args)
        .arg("-S")
        .arg("-emit-llvm")
        .arg(input)
        .arg("-o")
        .arg(ir_out);
    let display = format!(
        "{} {}",
        opts.compiler,
        command
            .get_args()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );
    info!("Executing: {}", display);

    let status = command
        .status()
        .map_err(|source| PipelineError::CompilerSpawn {
            compiler: opts.compiler.clone(),
            source,
        })?;
    if !status.success() {
        return Err(PipelineError::CompileFailure {
            command: display,
            code: status.code(),
        });
    }
    Ok(())
}

pub fn load_module(path: &Path, opts: &PipelineOptions) -> Result<Module, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ReadIr {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} bytes of IR from {}", text.len(), path.display());
    let mut module = Module::from_text(&text).map_err(|err| err.with_path(path))?;
    if let Some(style) = opts.pointer_style {
        module.pointer_style = style;
    }
    Ok(module)
}

pub fn write_module(module: &Module, output: &Path) -> Result<(), PipelineError> {
    let file = File::create(output).map_err(|source| PipelineError::OutputOpen {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{}", module.display())
        .and_then(|_| writer.flush())
        .map_err(|source| PipelineError::OutputWrite {
            path: output.to_path_buf(),
            source,
        })
}
