//! Domain error type for the emulator core, and its mapping onto gRPC
//! status codes at the RPC boundary.

use thiserror::Error;

/// Errors raised while servicing a Firestore RPC.
///
/// Every handler returns `Result<_, EmulatorError>` internally; the `From`
/// impl below is the single place that picks the gRPC status code, so
/// handlers never construct a `tonic::Status` directly.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// A malformed resource path, missing required field, or otherwise
    /// unparseable request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A recognized but deliberately unimplemented RPC (Listen, Write, ...).
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// Anything else: codec failures, lock poisoning, internal invariants.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EmulatorError {
    /// Build an [`EmulatorError::InvalidArgument`] from anything `Display`-able.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build an [`EmulatorError::NotFound`] from anything `Display`-able.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build an [`EmulatorError::Internal`] from anything `Display`-able.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<EmulatorError> for tonic::Status {
    fn from(err: EmulatorError) -> Self {
        match err {
            EmulatorError::InvalidArgument(msg) => tonic::Status::invalid_argument(msg),
            EmulatorError::NotFound(msg) => tonic::Status::not_found(msg),
            EmulatorError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            EmulatorError::Internal(msg) => tonic::Status::internal(msg),
        }
    }
}
