//! Error types for store operations.

use thiserror::Error;

/// Errors surfaced by store operations.
///
/// Key absence is never an error: lookups and deletes of missing keys
/// produce a normal `exist = false` [`Response`](crate::Response).
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to encode a response envelope or snapshot as JSON.
    ///
    /// The map mutation that produced the envelope is not rolled back;
    /// it already happened.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Failed to decode a snapshot during recovery.
    ///
    /// The map state afterward is undefined; the caller should retry
    /// recovery with a valid snapshot or abort.
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}
