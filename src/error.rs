/// Failures surfaced by the session controller. All are transient; the
/// controller is left in a well-defined state and never retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("chunk lookup failed: {0}")]
    ChunkFetchFailed(String),
    #[error("reset failed: {0}")]
    ResetFailed(String),
    #[error("no document uploaded")]
    NoDocument,
    #[error("an upload is already in progress")]
    UploadInFlight,
    #[error("a query is already in progress")]
    QueryInFlight,
    #[error("a reset is already in progress")]
    ResetInFlight,
}
