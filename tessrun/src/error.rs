use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TessrunError {
    #[error("Execution error: `{command}`: {source}")]
    Execution {
        command: String,
        #[source]
        source: ExecutionFailure,
    },

    #[error("Output not found: no .hocr, .html or .txt file for {}", stem.display())]
    OutputNotFound {
        stem: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    #[error("Read error: {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

/// Why the engine subprocess did not complete successfully.
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] io::Error),

    #[error("exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("invalid engine config: {0}")]
    Arguments(#[from] shell_words::ParseError),
}

pub type Result<T> = std::result::Result<T, TessrunError>;
