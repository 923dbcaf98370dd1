use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnexpectedEof,
    InvalidDescriptor(String),
    InvalidSignature {
        signature: String,
        position: usize,
        expected: &'static str,
    },
    InvalidTypePath(&'static str),
    Other(&'static str),
}

impl Error {
    pub(crate) fn signature(signature: &[u8], position: usize, expected: &'static str) -> Self {
        Error::InvalidSignature {
            signature: String::from_utf8_lossy(signature).into_owned(),
            position,
            expected,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "unexpected end of input"),
            Error::InvalidDescriptor(desc) => write!(f, "invalid descriptor: {desc}"),
            Error::InvalidSignature {
                signature,
                position,
                expected,
            } => write!(
                f,
                "invalid signature `{signature}` at offset {position}: expected {expected}"
            ),
            Error::InvalidTypePath(msg) => write!(f, "invalid type path: {msg}"),
            Error::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}
