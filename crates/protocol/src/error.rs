//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering all wire-level failure modes of one
/// su exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The channel closed mid-protocol. A single su invocation never
    /// reconnects, so this is always fatal.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A message did not match the fixed protocol shape.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A length-prefixed string exceeds the sanity bound.
    #[error("string too long: {len} bytes exceeds maximum of {max} bytes")]
    StringTooLong {
        /// Actual byte length.
        len: usize,
        /// Maximum allowed byte length.
        max: usize,
    },

    /// The peer announced a descriptor but the control message carried none.
    #[error("descriptor transfer message carried no descriptor")]
    DescriptorMissing,

    /// Any other I/O failure on the channel.
    #[error("I/O failure: {0}")]
    Io(std::io::Error),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed(err.to_string()),
            _ => ProtocolError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_closed_display() {
        let err = ProtocolError::ConnectionClosed("peer disconnected".to_string());
        assert_eq!(err.to_string(), "connection closed: peer disconnected");
    }

    #[test]
    fn test_malformed_display() {
        let err = ProtocolError::Malformed("truncated request record".to_string());
        assert_eq!(err.to_string(), "malformed message: truncated request record");
    }

    #[test]
    fn test_string_too_long_display() {
        let err = ProtocolError::StringTooLong {
            len: 100_000,
            max: 65536,
        };
        assert_eq!(
            err.to_string(),
            "string too long: 100000 bytes exceeds maximum of 65536 bytes"
        );
    }

    #[test]
    fn test_descriptor_missing_display() {
        let err = ProtocolError::DescriptorMissing;
        assert_eq!(
            err.to_string(),
            "descriptor transfer message carried no descriptor"
        );
    }

    #[test]
    fn test_from_io_error_eof() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: ProtocolError = io_err.into();
        assert!(matches!(err, ProtocolError::ConnectionClosed(_)));
    }

    #[test]
    fn test_from_io_error_broken_pipe() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: ProtocolError = io_err.into();
        assert!(matches!(err, ProtocolError::ConnectionClosed(_)));
    }

    #[test]
    fn test_from_io_error_other() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ProtocolError = io_err.into();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolError>();
    }
}
