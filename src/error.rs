use thiserror::Error;

/// Errors surfaced by the backend client.
///
/// Only the hard-failing operations (save, analysis) return these; model
/// reads swallow them and yield `None` instead. See [`crate::client`].
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {code}")]
    Status { code: u16 },
}
