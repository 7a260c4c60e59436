//! Domain errors raised by the batch layer itself
//!
//! Transport errors from the GitHub client are passed through untouched as
//! `anyhow::Error`; only conditions detected here get a dedicated variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// GitHub answered the merge call but did not merge
    #[error("merge of {repository}#{number} was rejected: {message}")]
    MergeRejected {
        repository: String,
        number: u64,
        message: String,
    },
}

impl BatchError {
    /// Whether an error chain represents cancellation
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<BatchError>(), Some(BatchError::Cancelled))
    }
}
