// Error types shared by every parser

use std::io;

/// Errors that abort a parse.
///
/// Anything recoverable (an undecodable frame, an unknown tag, a truncated
/// field) is recorded as a warning on the result instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not determine file type")]
    CouldNotDetermineFileType,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("unexpected {format} content: {message}")]
    UnexpectedFileContent {
        format: &'static str,
        message: String,
    },
    #[error("failed to decode field: {0}")]
    FieldDecoding(String),
    #[error("internal parser error: {0}")]
    InternalParser(String),
    #[error("unexpected end of stream")]
    EndOfStream,
    #[error("no data read from source")]
    EmptySource,
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::EndOfStream
        } else {
            Error::Io(e)
        }
    }
}

impl Error {
    pub(crate) fn content(format: &'static str, message: impl Into<String>) -> Self {
        Error::UnexpectedFileContent {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn field(message: impl Into<String>) -> Self {
        Error::FieldDecoding(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
