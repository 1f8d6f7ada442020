use thiserror::Error;

/// Failure to obtain the response stream from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request construction failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("exchange failed: {0}")]
    Exchange(#[source] reqwest::Error),

    #[error("exchange cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("invalid json")]
    InvalidJson,

    #[error("merged document is not valid json: {0}")]
    Format(#[source] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template has no %s placeholder")]
    MissingPlaceholder,

    #[error("template has {count} %s placeholders, expected exactly one")]
    MultiplePlaceholders { count: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config: read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config: parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("config: {0}")]
    Invalid(String),

    #[error("config: {0}")]
    Template(#[from] TemplateError),

    #[error("config: http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// One variant per pipeline stage. The cause is kept as `source()` and also
/// rendered inline so the whole chain prints on one line.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to obtain source stream: {0}")]
    Source(#[from] SourceError),

    #[error("failed to read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to merge: {0}")]
    Merge(#[from] MergeError),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
