/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for parsing and formatting.

use crate::ast::{Keyword, Span};
use thiserror::Error;

/// Errors that can occur while formatting a template document.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A block (or the root) is still open at the end of the input.
    #[error("missing end block")]
    UnterminatedBlock {
        /// Keyword of the innermost open block.
        keyword: Keyword,
        /// Span of the block's opening action.
        span: Span,
    },

    /// An `end` or `prettier-ignore-end` action with no open block.
    #[error("Encountered unexpected {keyword} keyword.")]
    UnexpectedEnd { keyword: Keyword, span: Span },

    /// An `else` action with no open block.
    #[error("Encountered else outside of a block.")]
    UnexpectedElse { span: Span },

    /// The scanner matched an action without a statement.
    #[error("Template action without statement.")]
    MissingStatement { span: Span },

    /// Blocks are nested deeper than the formatter supports.
    #[error("Blocks nested deeper than {max_depth} levels.")]
    NestingTooDeep { max_depth: usize, span: Span },

    /// Delegating to the markup formatter or splicing its output failed.
    #[error("Failed to embed template node: {message}")]
    EmbedFailure {
        message: String,
        span: Option<Span>,
    },

    /// Invalid configuration file contents.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error (e.g., reading a configuration file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Build an [`FormatError::EmbedFailure`] for a node.
    pub fn embed(message: impl Into<String>, span: impl Into<Option<Span>>) -> Self {
        FormatError::EmbedFailure {
            message: message.into(),
            span: span.into(),
        }
    }

    /// Source location of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            FormatError::UnterminatedBlock { span, .. }
            | FormatError::UnexpectedEnd { span, .. }
            | FormatError::UnexpectedElse { span }
            | FormatError::MissingStatement { span }
            | FormatError::NestingTooDeep { span, .. } => Some(*span),
            FormatError::EmbedFailure { span, .. } => *span,
            FormatError::Config(_) | FormatError::Io(_) => None,
        }
    }

    /// Whether this error was raised while parsing the template structure.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            FormatError::UnterminatedBlock { .. }
                | FormatError::UnexpectedEnd { .. }
                | FormatError::UnexpectedElse { .. }
                | FormatError::MissingStatement { .. }
                | FormatError::NestingTooDeep { .. }
        )
    }
}

/// Result type for formatting operations.
pub type FormatResult<T> = Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unterminated_block_message() {
        let err = FormatError::UnterminatedBlock {
            keyword: Keyword::If,
            span: Span::new(0, 10),
        };
        assert_eq!(err.to_string(), "missing end block");
        assert_eq!(err.span(), Some(Span::new(0, 10)));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_unexpected_end_names_keyword() {
        let err = FormatError::UnexpectedEnd {
            keyword: Keyword::PrettierIgnoreEnd,
            span: Span::new(3, 4),
        };
        assert_eq!(
            err.to_string(),
            "Encountered unexpected prettier-ignore-end keyword."
        );
    }

    #[test]
    fn test_embed_failure_is_not_a_parse_error() {
        let err = FormatError::embed("unresolved placeholder", None);
        assert!(!err.is_parse_error());
        assert_eq!(err.span(), None);
    }
}
