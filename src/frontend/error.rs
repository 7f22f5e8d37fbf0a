use crate::frontend::token::{Token, TokenKind};

/// A failure raised by the lexer, the parser, or the code generator.
///
/// Every compile error carries the 1-based source position of the offending
/// lexeme and a short description of what was found there, so the front end
/// can report `line:col` diagnostics without re-scanning the source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message} (at {location})")]
pub struct CompileError {
    pub message: String,
    pub line: usize,
    pub col: usize,
    /// The offending lexeme in quotes, or `end of file`.
    pub location: String,
}

impl CompileError {
    /// Error at an explicit position, with the raw text found there.
    pub fn at(message: impl Into<String>, line: usize, col: usize, found: &str) -> Self {
        CompileError {
            message: message.into(),
            line,
            col,
            location: format!("'{}'", found),
        }
    }

    /// Error anchored to a token; EOF tokens render as `end of file`.
    pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
        let location = if token.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        CompileError {
            message: message.into(),
            line: token.line,
            col: token.col,
            location,
        }
    }
}
