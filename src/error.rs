//! Error taxonomy shared across the pipeline.
//!
//! Three failure classes flow through the crate:
//!
//! - [`Error::Validation`] — user-correctable input problems (empty upload,
//!   unreadable document, blank goal). Mapped to `400` at the HTTP layer.
//! - [`Error::NotSupported`] — a capability the configured backend or
//!   provider lacks. Used internally (e.g. provider selection); surfaced
//!   as `400` if it ever escapes. Absence of a vector-search capability is
//!   *not* reported through this variant — the search engine falls back to
//!   keyword mode transparently instead.
//! - [`Error::Upstream`] — the storage or generation collaborator failed.
//!   Logged and mapped to `500`; never silently swallowed.
//!
//! Text-extraction failures are deliberately outside this taxonomy: the
//! extractor downgrades them to empty text so malformed uploads resolve to
//! the single "no readable text" validation path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or empty user input.
    #[error("{0}")]
    Validation(String),

    /// A requested capability is not implemented by the current backend.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A storage or generation collaborator failed.
    #[error("upstream failure: {0}")]
    Upstream(#[source] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_supported(what: impl Into<String>) -> Self {
        Error::NotSupported(what.into())
    }

    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        Error::Upstream(err.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Upstream(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_displays_bare_message() {
        let err = Error::validation("document has no readable text");
        assert_eq!(err.to_string(), "document has no readable text");
    }

    #[test]
    fn not_supported_names_the_capability() {
        let err = Error::not_supported("embedding provider 'openai'");
        assert_eq!(err.to_string(), "not supported: embedding provider 'openai'");
    }
}
