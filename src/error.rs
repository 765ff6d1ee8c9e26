//! Error types for svmerge.

use std::io;
use thiserror::Error;

/// Errors that can occur while reading calls, loading gaps or writing output.
#[derive(Error, Debug)]
pub enum SvError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown SV source tool: '{0}'")]
    UnknownSource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, SvError>;
