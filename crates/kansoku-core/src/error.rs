use std::time::Duration;

use kansoku_api::TransportError;
use kansoku_dom::DomError;
use kansoku_parse::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KansokuError {
    /// A required element never appeared.
    #[error("{selector:?} not found after {waited:?}")]
    NotFound { selector: String, waited: Duration },

    #[error("parse failed: {0}")]
    ParseFailure(String),

    #[error("no page identifier for {url}")]
    IdentifierMissing { url: String },

    #[error("enrichment failed: {0}")]
    EnrichmentFailure(String),

    #[error("transport timed out after {0:?}")]
    TransportTimeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("DOM error: {0}")]
    Dom(DomError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<ParseError> for KansokuError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::IdentifierMissing { url } => Self::IdentifierMissing { url },
            other => Self::ParseFailure(other.to_string()),
        }
    }
}

impl From<DomError> for KansokuError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::NotFound {
                selector, waited, ..
            } => Self::NotFound { selector, waited },
            other => Self::Dom(other),
        }
    }
}
