//! Pauses between successive mutating calls

use crate::cancel::ensure_active;
use crate::error::BatchError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Waits between two approve or merge calls
///
/// Implementations must return [`BatchError::Cancelled`] as soon as the
/// token fires, including while the pause is in progress.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> anyhow::Result<()>;
}

/// Sleeps for the requested delay on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelayPacer;

#[async_trait]
impl Pacer for FixedDelayPacer {
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> anyhow::Result<()> {
        ensure_active(cancel)?;
        if delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(BatchError::Cancelled.into()),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
