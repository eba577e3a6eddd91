use thiserror::Error;

/// Error classes surfaced by the library.
///
/// `InvalidConfig` and `IndexUnavailable` are fatal at startup; search
/// refuses to run without a loadable snapshot rather than returning
/// empty results silently. `Provider` wraps external-call failures that
/// escape their local fallback. Empty search results are not an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Provider call failed: {0}")]
    Provider(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
