use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Unified error type for the assertion toolkit.
///
/// `Setup` is caller misuse caught before any analysis runs, `Assertion` is
/// the component under test misbehaving, and `Internal` is a defect in this
/// toolkit itself.
#[derive(Debug)]
pub enum Error {
    Setup(String),
    Assertion {
        report: String,
    },
    Internal {
        message: String,
        backtrace: Option<Backtrace>,
    },
    Io(io::Error),
    Manifest {
        path: PathBuf,
        message: String,
    },
}

/// Convenience result alias used across the toolkit.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Construct a setup error: the caller supplied inputs that violate an
    /// entry point's contract.
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    /// Construct an assertion failure carrying the full human-readable
    /// report.
    pub fn assertion(report: impl Into<String>) -> Self {
        Self::Assertion {
            report: report.into(),
        }
    }

    /// Construct an internal invariant violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: capture_backtrace(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Return the captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Internal { backtrace, .. } => backtrace.as_ref(),
            _ => None,
        }
    }

    /// True when the error represents an assertion failure rather than
    /// misuse or a toolkit defect.
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Error::Assertion { .. })
    }

    #[must_use]
    pub fn is_setup(&self) -> bool {
        matches!(self, Error::Setup(_))
    }
}

fn capture_backtrace() -> Option<Backtrace> {
    if cfg!(debug_assertions) {
        Some(Backtrace::force_capture())
    } else {
        None
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Setup(message) => write!(f, "setup error: {message}"),
            Error::Assertion { report } => write!(f, "{report}"),
            Error::Internal { message, .. } => write!(
                f,
                "internal error: {message}; this indicates a defect in chic-asserts, not in the code under test"
            ),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Manifest { path, message } => {
                write!(f, "manifest error in `{}`: {message}", path.display())
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}
