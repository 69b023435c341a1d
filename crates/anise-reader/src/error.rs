use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug)]
pub struct ParseErrorData {
    pub message: String,
}

impl ParseErrorData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Every failure the reader can signal. All errors are fatal to the current
/// read; the reader state must be discarded afterwards.
#[derive(Error, Debug, Clone)]
pub enum ReaderError {
    #[error("Parse error: {0}")]
    Parse(ParseErrorData),

    /// Input ended while the named construct was still open.
    #[error("EOF while reading {context}")]
    UnexpectedEof { context: String },
}

impl ReaderError {
    pub fn parse(message: impl Into<String>) -> Self {
        ReaderError::Parse(ParseErrorData::new(message))
    }

    pub fn eof(context: impl Into<String>) -> Self {
        ReaderError::UnexpectedEof {
            context: context.into(),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, ReaderError::UnexpectedEof { .. })
    }
}
