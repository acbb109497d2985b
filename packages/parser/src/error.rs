use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Unclosed tag <{tag}> opened at {pos}")]
    UnclosedTag { pos: usize, tag: String },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset the error points at
    pub fn pos(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEof { pos, .. }
            | ParseError::UnclosedTag { pos, .. }
            | ParseError::MismatchedClosingTag { pos, .. }
            | ParseError::InvalidSyntax { pos, .. }
            | ParseError::LexerError { pos } => *pos,
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let start = error.pos().min(source.len());
    let end = (start + 1).min(source.len()).max(start);

    let label = match error {
        ParseError::UnexpectedToken { expected, .. } | ParseError::UnexpectedEof { expected, .. } => {
            format!("expected {}", expected)
        }
        ParseError::UnclosedTag { tag, .. } => format!("<{}> is never closed", tag),
        ParseError::MismatchedClosingTag { expected, .. } => format!("expected </{}>", expected),
        ParseError::InvalidSyntax { message, .. } => message.clone(),
        ParseError::LexerError { .. } => "unrecognized input".to_string(),
    };

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8(output).unwrap_or_else(|_| error.to_string()),
        Err(_) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos() {
        let err = ParseError::unexpected_eof(7, "'>'");
        assert_eq!(err.pos(), 7);
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_error_mentions_message() {
        let source = "<div>";
        let err = ParseError::UnclosedTag {
            pos: 0,
            tag: "div".to_string(),
        };
        let report = format_error(source, "page.html", &err);
        assert!(report.contains("Unclosed tag <div>"));
    }
}
