use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Network failure, timeout or non-success response.
    #[error("repo: remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The entity exists neither remotely nor in the cache.
    #[error("repo: not found: {0}")]
    NotFound(String),

    /// The caller aborted the operation.
    #[error("repo: cancelled")]
    Cancelled,

    /// The remote answered with a payload that could not be decoded.
    #[error("repo: decode failure: {0}")]
    Decode(String),
}

impl RepoError {
    /// Reports whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepoError::RemoteUnavailable(_))
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RepoError::Decode(e.to_string())
        } else {
            RepoError::RemoteUnavailable(e.to_string())
        }
    }
}
