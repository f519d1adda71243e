/// Failure of a single feed request attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("feed returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("malformed feed payload: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Parse(value.to_string());
        }
        Self::Network(value.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Terminal failure after the retry policy has been exhausted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("feed fetch failed after {attempts} attempt(s): {last}")]
pub struct FetchFailure {
    pub attempts: u32,
    #[source]
    pub last: FeedError,
}
