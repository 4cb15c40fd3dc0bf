//! Error types reported by XFRM programmers

use std::fmt;

/// Error returned by an [`XfrmProgrammer`](crate::XfrmProgrammer) implementation
#[derive(Debug)]
pub enum XfrmError {
    /// I/O error talking to the kernel (netlink socket, etc.)
    Io(std::io::Error),

    /// The state or policy addressed by a delete does not exist
    NotFound(String),

    /// The kernel rejected the descriptor (bad algorithm, key length, ...)
    Rejected(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl XfrmError {
    /// Returns true if this error means "nothing to delete"
    ///
    /// Covers both the explicit [`XfrmError::NotFound`] variant and raw
    /// `ENOENT`/`ESRCH`-style I/O errors surfaced as [`std::io::ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        match self {
            XfrmError::NotFound(_) => true,
            XfrmError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl fmt::Display for XfrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XfrmError::Io(e) => write!(f, "IO error: {}", e),
            XfrmError::NotFound(what) => write!(f, "no such entry: {}", what),
            XfrmError::Rejected(msg) => write!(f, "rejected by kernel: {}", msg),
            XfrmError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for XfrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XfrmError::Io(e) => Some(e),
            XfrmError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XfrmError {
    fn from(err: std::io::Error) -> Self {
        XfrmError::Io(err)
    }
}

/// Result type for XFRM programming operations
pub type XfrmResult<T> = Result<T, XfrmError>;
