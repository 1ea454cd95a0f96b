use std::io;

/// Errors surfaced by the transport layer.
///
/// Only the cases where the connection itself can no longer be trusted
/// become an `RpcError`. Failures reported by the peer through the normal
/// result path travel as `FailureInfo` payloads and end up on the
/// [`Controller`](crate::Controller) instead.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Connect, read or write failure on the socket.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The deadline expired before the operation completed.
    #[error("operation timed out")]
    Timeout,

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Eof,

    /// The byte stream does not hold a well-formed frame.
    #[error("decode error: {0}")]
    Decode(String),

    /// The peer sent a control message that fails validation.
    #[error("{0}")]
    Protocol(&'static str),

    /// The server rejected the connection during the handshake.
    #[error("{0}")]
    Remote(String),
}

impl From<prost::DecodeError> for RpcError {
    #[inline]
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}
