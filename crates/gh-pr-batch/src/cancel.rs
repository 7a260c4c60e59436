use crate::error::BatchError;
use gh_client::{ClientProvider, GitHubClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fail with [`BatchError::Cancelled`] once the token has fired
///
/// Called before every network call so cancellation takes effect before
/// the next request goes out.
pub fn ensure_active(cancel: &CancellationToken) -> anyhow::Result<()> {
    if cancel.is_cancelled() {
        return Err(BatchError::Cancelled.into());
    }
    Ok(())
}

/// Obtain a client from `provider`, reporting a fired token as
/// [`BatchError::Cancelled`]
///
/// Providers fail in their own words when the token fires while they are
/// waiting, so the token is consulted again before their error is passed on.
pub async fn client_for(
    provider: &dyn ClientProvider,
    cancel: &CancellationToken,
) -> anyhow::Result<Arc<dyn GitHubClient>> {
    ensure_active(cancel)?;
    match provider.client(cancel).await {
        Ok(client) => {
            ensure_active(cancel)?;
            Ok(client)
        }
        Err(e) => {
            ensure_active(cancel)?;
            Err(e)
        }
    }
}
