//! Per-record failure reasons
//!
//! None of these abort a run. They are carried in
//! [`UploadOutcome::Failed`](crate::executor::UploadOutcome) and end up as one
//! line in the error log.

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    /// Fewer fields on the line than declared attributes
    #[error("malformed record: expected {expected} fields, found {found}")]
    Malformed { expected: usize, found: usize },

    /// An attribute the identity or an endpoint needs is not in the layout
    #[error("attribute '{0}' is not part of the record layout")]
    MissingAttribute(String),

    /// The store accepted the request but created nothing
    #[error("could not insert {0}")]
    InsertRejected(&'static str),

    #[error("store request failed: {0}")]
    Store(#[from] StoreError),

    /// The line could not be decoded by the tabular reader
    #[error("unreadable line: {0}")]
    Read(String),
}
