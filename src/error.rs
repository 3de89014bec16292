use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum NgdError {
    #[error("unsupported {field}: {value}")]
    UnsupportedChoice { field: &'static str, value: String },

    #[error("unrecognized option: {0}")]
    UnknownOption(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid list source: {0}")]
    InvalidListSource(String),

    #[error("{0} has no enumerated choices")]
    NoChoices(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("connection to NCBI failed: {0}")]
    #[diagnostic(help("this is usually transient, try again with --retries"))]
    Connection(String),

    #[error("NCBI request failed: {0}")]
    Http(String),

    #[error("NCBI returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("no entry for file ending in {0:?}")]
    MissingFormat(String),

    #[error("path exists and is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("metadata table needs a local_filename column")]
    MissingLocalFilenameColumn,

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("interrupted by user")]
    Interrupted,
}

impl NgdError {
    pub fn is_connection(&self) -> bool {
        matches!(self, NgdError::Connection(_))
    }
}
