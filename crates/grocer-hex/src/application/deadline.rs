use std::future::Future;
use std::time::Duration;

use grocer_types::ports::RepoError;

/// Outcome of a persistence call that did not succeed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Runs `call`, giving up after `limit`.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res.map_err(CallError::Repo),
        Err(_) => Err(CallError::Timeout(limit)),
    }
}
