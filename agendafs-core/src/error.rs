//! Error types for agendafs operations.

use std::io;

use thiserror::Error;

/// Errors that can occur in agendafs operations.
#[derive(Error, Debug)]
pub enum AgendaFsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of an [`AgendaFsError`], one per host error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    InvalidArgument,
    PermissionDenied,
    Io,
}

impl AgendaFsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgendaFsError::NotFound(_) => ErrorKind::NotFound,
            AgendaFsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AgendaFsError::NotADirectory(_) => ErrorKind::NotADirectory,
            AgendaFsError::IsADirectory(_) => ErrorKind::IsADirectory,
            AgendaFsError::NotEmpty(_) => ErrorKind::NotEmpty,
            AgendaFsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AgendaFsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AgendaFsError::IcsParse(_) | AgendaFsError::Config(_) | AgendaFsError::Io(_) => {
                ErrorKind::Io
            }
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    pub fn denied(what: impl Into<String>) -> Self {
        Self::PermissionDenied(what.into())
    }
}

/// Convert to std::io::Error so a host adapter can map to errno.
impl From<AgendaFsError> for io::Error {
    fn from(e: AgendaFsError) -> Self {
        match e {
            AgendaFsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            AgendaFsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            AgendaFsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            AgendaFsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            AgendaFsError::NotEmpty(msg) => io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg),
            AgendaFsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            AgendaFsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            AgendaFsError::IcsParse(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            AgendaFsError::Config(msg) => io::Error::other(msg),
            AgendaFsError::Io(e) => e,
        }
    }
}

/// Result type alias for agendafs operations.
pub type AgendaFsResult<T> = Result<T, AgendaFsError>;
