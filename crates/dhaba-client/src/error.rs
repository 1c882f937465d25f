//! # Client Error Types

use thiserror::Error;

/// Errors from the API client.
///
/// Duplicates are NOT errors here: they come back as
/// [`crate::SubmissionOutcome::Duplicate`] so callers treat them as
/// informational rather than retryable failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, bad body).
    /// The guard reservation is released; a retry is legitimate.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success, non-conflict status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}
