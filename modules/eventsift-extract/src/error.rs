use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Every fetch strategy failed; extraction for this URL stops.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid URL {0}")]
    InvalidUrl(String),
}

/// Per-candidate normalization failure. Collected, never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Missing title")]
    MissingTitle,

    #[error("Missing or unparseable start date for \"{0}\"")]
    MissingStart(String),
}
