use std::io;
use std::path::PathBuf;

use kernel::KernelError;
use thiserror::Error;

/// Everything that can abort a simulation run.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to open trace file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read failed on trace file {name} at line {line}: {source}")]
    Read {
        name: String,
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("invalid command at line {line}:\n{text}")]
    UnknownCommand { line: usize, text: String },
    #[error("missing {what} for {command} at line {line}")]
    MissingArgument {
        line: usize,
        command: String,
        what: &'static str,
    },
    #[error("unparsable hex argument {arg:?} at line {line}")]
    BadArgument { line: usize, arg: String },
    #[error("failed to load config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("process {id}: {source}")]
    Kernel {
        id: u32,
        #[source]
        source: KernelError,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
