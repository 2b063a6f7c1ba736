//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// An error that occurs when reading LLVM textual IR into a `Module`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}:{line}: error: {message}", display_path(.path))]
pub struct ParseError {
    /// The file the text came from, once known.
    pub path: Option<PathBuf>,
    /// 1-based line of the offending statement.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new<S: Into<String>>(line: usize, message: S) -> Self {
        ParseError {
            path: None,
            line,
            message: message.into(),
        }
    }

    /// Attach the path of the file being parsed.
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<input>".to_string(),
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// A symbol could not be resolved to a function with the requested
/// signature.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cannot declare `{name}`: {reason}")]
pub struct DeclarationConflict {
    pub name: String,
    pub reason: String,
}

/// A fatal error in one stage of the compile/instrument/emit pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The front-end compiler could not be started at all.
    #[error("failed to run compiler `{compiler}`")]
    CompilerSpawn {
        compiler: String,
        #[source]
        source: std::io::Error,
    },
    /// The front-end compiler exited unsuccessfully.
    #[error("error compiling to LLVM IR: `{command}` ended with {}", display_code(.code))]
    CompileFailure { command: String, code: Option<i32> },
    /// The intermediate IR file could not be created.
    #[error("failed to create temporary IR file")]
    TempFile(#[source] std::io::Error),
    /// The IR file could not be read.
    #[error("failed to read LLVM IR file '{}'", .path.display())]
    ReadIr {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The IR text was malformed.
    #[error("error parsing LLVM IR: {0}")]
    Parse(#[from] ParseError),
    /// The destination could not be opened for writing.
    #[error("error opening output file '{}'", .path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Serialization failed part-way; the partial output is left in place.
    #[error("error writing to output file '{}'", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
