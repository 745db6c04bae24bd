use std::{error::Error, fmt, io};

/// The crate's result type.
pub type Result<T> = std::result::Result<T, SpmdErr>;

/// Failures of a run, all of them terminal for the whole group.
#[derive(Debug)]
pub enum SpmdErr {
    Io(io::Error),
    /// Invalid configuration, caught before the first collective call.
    InvalidConfig(String),
    /// A kernel precondition that would otherwise produce undefined arithmetic.
    Precondition(String),
    /// The peer sent something other than what the collective expects.
    UnexpectedMessage {
        op: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    /// Buffer sizes disagree between the caller and the wire.
    LengthMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
    /// Another member of the group aborted the run.
    Remote(String),
    Overflow(String),
}

impl fmt::Display for SpmdErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpmdErr::Io(e) => write!(f, "io error: {e}"),
            SpmdErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            SpmdErr::Precondition(msg) => write!(f, "precondition violated: {msg}"),
            SpmdErr::UnexpectedMessage { op, expected, got } => {
                write!(f, "unexpected message during {op}: expected {expected}, got {got}")
            }
            SpmdErr::LengthMismatch { op, got, expected } => {
                write!(f, "length mismatch during {op}: got {got}, expected {expected}")
            }
            SpmdErr::Remote(reason) => write!(f, "run aborted by a peer: {reason}"),
            SpmdErr::Overflow(msg) => write!(f, "arithmetic overflow: {msg}"),
        }
    }
}

impl Error for SpmdErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SpmdErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SpmdErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<SpmdErr> for io::Error {
    fn from(value: SpmdErr) -> Self {
        match value {
            SpmdErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
