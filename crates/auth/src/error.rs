use thiserror::Error;

/// Failure modes of a single authentication attempt.
///
/// None of these is surfaced to the end user: the gateway answers abstain
/// and lets the host fall through to another provider or show its generic
/// invalid-login message. They exist so every abstain carries a diagnosable
/// reason in the log.
#[derive(Debug, Error)]
pub enum AuthFailure {
    /// The outbound call failed at the transport level: connection refused,
    /// timeout, TLS failure, or a non-200 status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body did not decode as the expected JSON.
    #[error("malformed response from {endpoint}")]
    MalformedResponse {
        /// The remote endpoint that produced the body.
        endpoint: &'static str,
    },

    /// The remote system answered with an explicit error or exception.
    #[error("remote system rejected the request: {0}")]
    RemoteRejected(String),

    /// The remote account behind the token is not the requested user.
    #[error("remote identity does not match requested username '{expected}'")]
    IdentityMismatch {
        /// The canonical username the attempt was made for.
        expected: String,
    },

    /// Well-formed JSON that fits no known response shape.
    #[error("unrecognized response from the remote system: {0}")]
    Unknown(String),

    /// No pending attempt state was found at post-authentication time,
    /// e.g. after a restart or when a concurrent attempt consumed it first.
    #[error("pending authentication state for '{0}' was lost")]
    StateLost(String),
}
