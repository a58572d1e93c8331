//! Unified error types for msiole.
//!
//! Every failure of the compound file reader is one of four kinds: the input
//! is not a (supported) compound file, the underlying I/O failed, the file's
//! internal bookkeeping is inconsistent, or the reader was used after
//! `close`. [`Error::kind`] exposes that classification.
use thiserror::Error;

/// Main error type for msiole operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the underlying reader
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A positioned read failed
    #[error("IO error reading {length} bytes at offset {offset}: {source}")]
    ReadFailed {
        offset: u64,
        length: usize,
        #[source]
        source: std::io::Error,
    },

    /// A sector or region lies (partly) beyond the end of the file
    #[error("Truncated file: {length} bytes at offset {offset} exceed file size {file_size}")]
    Truncated {
        offset: u64,
        length: usize,
        file_size: u64,
    },

    /// The input does not start with the compound file signature
    #[error("Not an OLE compound file")]
    NotOleFile,

    /// Header geometry outside the supported revisions
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Corrupted or malformed file
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// Operation attempted after the compound file was closed
    #[error("Compound file has been closed")]
    Closed,

    /// Storage or stream not found
    #[error("Component not found: {0}")]
    ComponentNotFound(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a compound file, or an unsupported revision
    Format,
    /// Underlying read failed or returned too few bytes
    Io,
    /// Internal consistency of the file is violated
    Corruption,
    /// The reader was used after `close`
    UseAfterClose,
    /// A looked-up storage or stream does not exist
    NotFound,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotOleFile | Error::InvalidFormat(_) => ErrorKind::Format,
            Error::Io(_) | Error::ReadFailed { .. } | Error::Truncated { .. } => ErrorKind::Io,
            Error::CorruptedFile(_) => ErrorKind::Corruption,
            Error::Closed => ErrorKind::UseAfterClose,
            Error::ComponentNotFound(_) => ErrorKind::NotFound,
        }
    }

    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Error::CorruptedFile(msg.into())
    }

    pub(crate) fn invalid_format(msg: impl Into<String>) -> Self {
        Error::InvalidFormat(msg.into())
    }
}

/// Result type for msiole operations.
pub type Result<T> = std::result::Result<T, Error>;
