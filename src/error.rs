//! Errors produced by streams.

use crate::chunk::Encoding;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors produced by readable and writable streams.
///
/// The error is cheap to clone, since a single failure may be delivered to a write callback, recorded in
/// the stream's error slot, and emitted as an `error` notification.
#[derive(Clone, Debug, Error)]
pub enum StreamError {
    /// The chunk type is not accepted in the stream's mode.
    #[error("invalid chunk: {0}")]
    InvalidChunk(&'static str),

    /// The encoding name is not recognized.
    #[error("unknown encoding `{0}`")]
    UnknownEncoding(String),

    /// Text could not be converted to bytes with the requested encoding.
    #[error("cannot decode text as {encoding}: {reason}")]
    Decode { encoding: Encoding, reason: String },

    #[error("write after end")]
    WriteAfterEnd,

    #[error("cannot call write after a stream was destroyed")]
    Destroyed,

    #[error("stream.push() after EOF")]
    PushAfterEof,

    #[error("stream.unshift() after end event")]
    UnshiftAfterEnd,

    /// The stream closed before it finished.
    #[error("premature close")]
    PrematureClose,

    /// A failure reported by a source or sink.
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    /// Wraps an integrator failure.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::other(e)
    }
}

impl From<StreamError> for std::io::Error {
    fn from(e: StreamError) -> Self {
        let kind = match &e {
            StreamError::InvalidChunk(_)
            | StreamError::UnknownEncoding(_)
            | StreamError::Decode { .. } => std::io::ErrorKind::InvalidInput,
            StreamError::WriteAfterEnd | StreamError::Destroyed | StreamError::PushAfterEof => {
                std::io::ErrorKind::BrokenPipe
            }
            StreamError::PrematureClose => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::Other,
        };
        Self::new(kind, e)
    }
}
