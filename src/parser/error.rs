use thiserror::Error;

use crate::common::error::ErrorKind;
use crate::parser::lexer::LexError;
use crate::parser::span::Location;

/// Errors produced while lexing or parsing a single compilation unit.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("{0}")]
    Lexical(#[from] LexError),

    #[error("{message} at {location}")]
    Unexpected { message: String, location: Location },
}

impl ParseError {
    pub fn unexpected(message: impl Into<String>, location: Location) -> Self {
        Self::Unexpected { message: message.into(), location }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Lexical(_) => ErrorKind::Lexical,
            ParseError::Unexpected { .. } => ErrorKind::Syntactic,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            ParseError::Lexical(e) => e.location,
            ParseError::Unexpected { location, .. } => *location,
        }
    }
}
