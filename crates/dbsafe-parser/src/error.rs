//! Parser error types.

/// Errors for genuinely unusable input.
///
/// Recognized-but-unclassifiable DDL is not an error: the parser tags it
/// `other_ddl` so the engine can apply its unparsable-operation rule.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input contained no SQL.
    #[error("no SQL statement provided")]
    Empty,

    /// The statement is outside the DDL/DML surface this tool analyzes.
    #[error("unsupported statement kind: {keyword}")]
    UnsupportedStatement {
        /// The leading keyword that was not recognized.
        keyword: String,
    },

    /// A statement was recognized but its target table could not be found.
    #[error("could not locate the target table in: {context}")]
    MissingTable {
        /// The statement fragment that was being examined.
        context: String,
    },
}

/// Convenience alias used throughout the parser crate.
pub type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
    /// Creates an [`ParseError::UnsupportedStatement`] for the given keyword.
    pub fn unsupported(keyword: impl Into<String>) -> Self {
        Self::UnsupportedStatement {
            keyword: keyword.into(),
        }
    }

    /// Creates a [`ParseError::MissingTable`] with a trimmed context snippet.
    pub fn missing_table(context: &str) -> Self {
        let snippet: String = context.chars().take(80).collect();
        Self::MissingTable { context: snippet }
    }
}
