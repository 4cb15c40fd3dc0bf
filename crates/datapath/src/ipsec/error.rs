//! Error types for IPSec key and endpoint operations
//!
//! Every error is returned to the immediate caller. Nothing is retried here:
//! repeated upserts replace existing state and repeated deletes are no-ops,
//! so retry policy belongs to whoever drives the endpoints.

use podsec_platform::XfrmError;
use std::fmt;
use std::path::PathBuf;

/// Result type for IPSec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`], for callers that branch on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key file does not exist
    FileNotFound,
    /// Key file content is malformed
    Parse,
    /// No key resolves for the requested address
    KeyMissing,
    /// The kernel rejected a state or policy
    ProgrammingFailed,
    /// Invalid argument from the caller
    InvalidParameter,
    /// Other I/O failure
    Io,
}

/// IPSec key store and endpoint errors
#[derive(Debug)]
pub enum Error {
    /// Key file does not exist
    FileNotFound(PathBuf),

    /// Malformed key line
    Parse {
        /// 1-based line number, 0 when parsing a lone line
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// No key for the remote address and no wildcard key
    KeyMissing {
        /// Which step failed to resolve a key
        context: &'static str,
    },

    /// State or policy programming failed
    ProgrammingFailed {
        /// Which step failed
        context: &'static str,
        /// Error reported by the programmer
        source: XfrmError,
    },

    /// Invalid parameter
    InvalidParameter(String),

    /// I/O error other than a missing file
    Io(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound(_) => ErrorKind::FileNotFound,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::KeyMissing { .. } => ErrorKind::KeyMissing,
            Error::ProgrammingFailed { .. } => ErrorKind::ProgrammingFailed,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// True if the key file does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::FileNotFound
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Error::Parse {
            line: 0,
            reason: reason.into(),
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            Error::Parse { reason, .. } => Error::Parse { line, reason },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileNotFound(path) => {
                write!(f, "IPSec key file not found: {}", path.display())
            }
            Error::Parse { line: 0, reason } => write!(f, "Invalid IPSec key: {}", reason),
            Error::Parse { line, reason } => {
                write!(f, "Invalid IPSec key on line {}: {}", line, reason)
            }
            Error::KeyMissing { context } => write!(f, "{}: IPSec key missing", context),
            Error::ProgrammingFailed { context, source } => write!(f, "{}: {}", context, source),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProgrammingFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
