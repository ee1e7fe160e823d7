use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid class name: {0}")]
    InvalidClassName(String),

    #[error("invalid search region: {0}")]
    InvalidRegion(String),

    #[error("invalid minimum image size: {0}")]
    InvalidImageSize(String),

    #[error("max_per_query must be a positive integer")]
    InvalidMaxPerQuery,

    #[error("invalid query pair (expected CLASS=QUERY): {0}")]
    InvalidQueryPair(String),

    #[error("missing job file image-harvest.json in current directory")]
    #[diagnostic(help("pass --config <path> or at least one --query CLASS=QUERY"))]
    MissingConfig,

    #[error("failed to read job file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse job file: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("image search request failed: {0}")]
    SearchHttp(String),

    #[error("image search returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("image search session token not found for query {0:?}")]
    SearchToken(String),

    #[error("failed to parse image search response: {0}")]
    SearchParse(String),

    #[error("search provider used outside of an open session")]
    ProviderClosed,
}

impl HarvestError {
    /// Process exit status: 2 for bad input, 3 for search or network
    /// failures, 1 for anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            HarvestError::MissingConfig
            | HarvestError::ConfigRead(_)
            | HarvestError::ConfigParse(_)
            | HarvestError::InvalidClassName(_)
            | HarvestError::InvalidRegion(_)
            | HarvestError::InvalidImageSize(_)
            | HarvestError::InvalidMaxPerQuery
            | HarvestError::InvalidQueryPair(_) => 2,
            HarvestError::HttpClient(_)
            | HarvestError::SearchHttp(_)
            | HarvestError::SearchStatus { .. }
            | HarvestError::SearchToken(_)
            | HarvestError::SearchParse(_) => 3,
            HarvestError::Filesystem(_) | HarvestError::ProviderClosed => 1,
        }
    }
}

/// Why a single candidate download did not materialize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("server returned status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => FetchError::Timeout,
            _ => FetchError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_failure_kind() {
        assert_eq!(HarvestError::MissingConfig.exit_code(), 2);
        assert_eq!(HarvestError::ConfigParse("bad".into()).exit_code(), 2);
        assert_eq!(HarvestError::InvalidQueryPair("cats=".into()).exit_code(), 2);
        assert_eq!(HarvestError::InvalidMaxPerQuery.exit_code(), 2);

        let status = HarvestError::SearchStatus {
            status: 403,
            message: "slow down".into(),
        };
        assert_eq!(status.exit_code(), 3);
        assert_eq!(HarvestError::SearchToken("cats".into()).exit_code(), 3);
        assert_eq!(HarvestError::SearchParse("eof".into()).exit_code(), 3);
        assert_eq!(HarvestError::HttpClient("tls".into()).exit_code(), 3);

        assert_eq!(HarvestError::Filesystem("denied".into()).exit_code(), 1);
        assert_eq!(HarvestError::ProviderClosed.exit_code(), 1);
    }
}
