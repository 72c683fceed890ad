//! Error types for the Ecumene registry
//!
//! Malformed wire input is never an error: such messages are dropped
//! without a reply. Everything here is a store, transport, or startup
//! failure, and all of those are fatal to the owning service loop.

use thiserror::Error;

/// Primary error type for all registry operations
#[derive(Debug, Error)]
pub enum EcumeneError {
    // ========== Store Errors ==========

    /// Could not establish a store connection
    #[error("Store connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// A store round trip failed
    #[error("Store operation failed: {message}")]
    Store { message: String },

    /// The store rejected a script compile
    #[error("Script load rejected by store: {message}")]
    ScriptLoad { message: String },

    /// The store answered with a reply shape we cannot interpret
    #[error("Unexpected store reply: {message}")]
    UnexpectedReply { message: String },

    // ========== Transport Errors ==========

    /// A listen socket could not be bound
    #[error("Socket bind to {endpoint} failed: {reason}")]
    BindFailed { endpoint: String, reason: String },

    /// A socket send/recv/connect failed
    #[error("Transport error: {message}")]
    Transport { message: String },

    // ========== Client Errors ==========

    /// No reply arrived in time; dropped requests surface here
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, EcumeneError>;
