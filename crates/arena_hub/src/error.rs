//! Hub error types.

use crate::ErrorCode;
use derive_more::{Display, Error};
use tracing::instrument;

/// Inbound frame the hub refuses to act on.
///
/// Protocol errors never travel further than the originating client: they are
/// turned into an `error` message and delivered to that client only.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProtocolError {
    /// Not JSON, not an object, or missing/ill-typed fields.
    #[display("Invalid message format: {}", _0)]
    InvalidFormat(String),

    /// Chat content above the configured limit.
    #[display("Message too long: {} characters (limit {})", length, limit)]
    MessageTooLong {
        /// Characters received.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Type tag the hub does not accept from clients.
    #[display("Unknown message type: {}", _0)]
    UnknownType(String),
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Wire error code for the reply.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            ProtocolError::MessageTooLong { .. } => ErrorCode::MessageTooLong,
            ProtocolError::UnknownType(_) => ErrorCode::UnknownType,
        }
    }
}

/// Failure of one client's connection. Terminal for that client only.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error: {} at {}:{}", message, file, line)]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a new transport error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// The hub control loop is no longer accepting events.
#[derive(Debug, Clone, Display, Error)]
#[display("Hub error: {} at {}:{}", message, file, line)]
pub struct HubError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl HubError {
    /// Creates a new hub error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    #[track_caller]
    pub(crate) fn stopped() -> Self {
        Self::new("hub loop has stopped")
    }
}

/// A [`HubConfig`](crate::HubConfig) value the hub cannot run with.
#[derive(Debug, Clone, Display, Error)]
#[display("Hub config error: {} at {}:{}", message, file, line)]
pub struct HubConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl HubConfigError {
    /// Creates a new config error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_codes() {
        assert_eq!(
            ProtocolError::InvalidFormat("x".into()).code(),
            ErrorCode::InvalidFormat
        );
        assert_eq!(
            ProtocolError::MessageTooLong {
                length: 201,
                limit: 200
            }
            .code(),
            ErrorCode::MessageTooLong
        );
        assert_eq!(
            ProtocolError::UnknownType("dance".into()).code(),
            ErrorCode::UnknownType
        );
    }

    #[test]
    fn test_located_error_records_caller() {
        let err = TransportError::new("socket closed");
        assert_eq!(err.file, file!());
        assert!(err.to_string().contains("socket closed"));
    }
}
