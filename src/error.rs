//! Error types shared by the video and audio payloaders.

use thiserror::Error;

/// Failure modes of a single `push_frame` / `push_packet` call, or of
/// constructing a payloader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// AES reported an error, or a key/IV was the wrong length.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// Reed-Solomon `reconstruct` was asked to repair more erasures than it
    /// has parity shards for. Never produced on the send path; kept here for
    /// the receiver-side adapter used in tests.
    #[error("unrecoverable loss: {lost} erasures exceed {parity} parity shards")]
    UnrecoverableLoss {
        /// Number of shards marked erased.
        lost: usize,
        /// Number of parity shards available to repair them.
        parity: usize,
    },

    /// Raised at construction time when the configuration cannot produce a
    /// valid stream.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The framed/encrypted payload does not fit in the configured shard
    /// size. The frame or packet that triggered this is dropped.
    #[error("oversized payload: {actual} bytes does not fit in {limit} bytes")]
    OversizedPayload {
        /// Size of the payload that didn't fit.
        actual: usize,
        /// Configured limit it was measured against.
        limit: usize,
    },
}
