//! Inference error types.

use thiserror::Error;

/// Errors that can occur while talking to the hosted model API.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode completion response: {reason}")]
    DecodeError { reason: String },

    /// The response carried no choices.
    #[error("completion response contained no choices")]
    EmptyResponse,
}
