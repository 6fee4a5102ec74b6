use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command write failed: {0}")]
    WriteFailed(String),

    #[error("command query failed: {0}")]
    QueryFailed(String),

    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("bulk save rejected: {failed} of {total} commands failed")]
    BulkRejected { failed: usize, total: usize },

    #[error("unbounded scan refused: add filters or an explicit page window")]
    UnboundedScan,

    #[error("timestamp {0} is outside the representable date range")]
    InvalidTimestamp(i64),
}
