//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Parse error: {0}")]
    Parse(#[from] tandem_parser::ParseError),

    #[error("Invalid component tree: {0}")]
    InvalidTree(#[from] tandem_common::CommonError),

    #[error("Manual conflict strategy cannot be resolved automatically")]
    ManualStrategy,

    #[error("No conflict is awaiting resolution")]
    NothingPending,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Asynchronous publish requires a running Tokio runtime")]
    NoRuntime,
}
