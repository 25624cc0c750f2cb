use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RepoError;

/// Runs a remote call, aborting it when `cancel` fires or `timeout` elapses.
///
/// An already-cancelled token short-circuits before the call is polled.
pub(crate) async fn guarded<T, F>(
    call: F,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(RepoError::RemoteUnavailable(format!(
                    "remote call timed out after {limit:?}"
                ))),
            },
            None => call.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepoError::Cancelled),
        result = bounded => result,
    }
}
