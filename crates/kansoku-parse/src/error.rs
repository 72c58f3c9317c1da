use thiserror::Error;

/// Errors from identity and page identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The subtitle panel held text that doesn't follow the episode grammar.
    #[error("unrecognized subtitle format: {0:?}")]
    UnrecognizedSubtitle(String),

    /// A season or episode number didn't fit in a `u32`.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// Neither the URL nor the last play click produced an identifier.
    #[error("no page identifier for {url:?}")]
    IdentifierMissing { url: String },

    #[error("invalid pattern database: {0}")]
    Patterns(String),
}
