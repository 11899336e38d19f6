//! Error types for the chat server
//!
//! Defines connection-level errors, outbound delivery errors and
//! configuration errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Connection-level errors
///
/// Every variant ends only the affected connection, never the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing failed (I/O error, line too long)
    #[error("Line codec error: {0}")]
    Codec(#[from] CodecError),

    /// Peer closed the connection before sending a display name
    #[error("Connection closed before login completed")]
    LoginAborted,

    /// The room actor has stopped and no longer accepts intents
    #[error("Room is no longer running")]
    RoomClosed,
}

/// Line framing errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// An inbound line exceeded the configured maximum length
    #[error("max line length exceeded")]
    MaxLineLengthExceeded,

    /// The transport failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound delivery errors
///
/// Occurs when the room hands a line to a session's outbound queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The session's write loop has exited
    #[error("Channel closed")]
    ChannelClosed,

    /// The session's outbound queue is at capacity
    #[error("Outbound queue full")]
    QueueFull,
}

/// Configuration errors, reported once at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown overflow policy name
    #[error("Invalid overflow policy '{0}' (expected 'block' or 'disconnect')")]
    InvalidOverflowPolicy(String),

    /// A numeric setting that is not a positive integer
    #[error("Invalid value '{value}' for {var}: expected a positive integer")]
    InvalidNumber { var: &'static str, value: String },
}
