//! Error handling for dzmedia.
//!
//! Provides a unified error type combining a failure category with the
//! underlying error details.
//!
//! # Error Categories
//!
//! Failures fall into the categories a playback session needs to react to
//! differently:
//! * Upstream-reported resolution errors and malformed envelopes
//! * Missing preview configuration
//! * Out-of-range seeks (caller precondition violations)
//! * Transport failures during range fetches
//!
//! None of these are retried internally; all propagate to the session layer.
//!
//! # Example
//!
//! ```rust
//! use dzmedia::error::{Error, ErrorKind, Result};
//!
//! fn do_something() -> Result<()> {
//!     if condition {
//!         return Err(Error::out_of_range("position beyond end of content"));
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
///
/// Provides:
/// * Categorized error types ([`ErrorKind`])
/// * Underlying error details
/// * Conversion from common error types
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// Allows accessing the original error when its concrete type is known.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for dzmedia operations.
///
/// Wraps the standard `Result` type with our custom [`struct@Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories for the acquisition and decryption pipeline.
///
/// Each variant represents a distinct failure a caller reacts to
/// differently: upstream errors are surfaced, caller errors indicate
/// a programming mistake, transport errors may warrant retrying the
/// whole session.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// Operation was cancelled before completion, e.g. a session stop
    /// closing the transport mid-read.
    #[error("operation was cancelled")]
    Cancelled,

    /// A provided argument failed local validation.
    #[error("invalid argument specified")]
    InvalidArgument,

    /// The resolution endpoint reported one or more errors, or returned
    /// no response body at all.
    #[error("media resolution failed")]
    MediaResolution,

    /// The preview sub-path was requested but no preview URI is configured.
    #[error("no preview available")]
    MissingPreview,

    /// A value exceeded its allowed bounds, e.g. a seek beyond the end
    /// of the content.
    #[error("out of range")]
    OutOfRange,

    /// The upstream response violated the expected wire format, e.g. a
    /// success envelope without a media URL.
    #[error("protocol violation")]
    ProtocolViolation,

    /// A network failure during the resolution call or a range fetch.
    #[error("transport failure")]
    Transport,

    /// An unexpected internal error that shouldn't occur during normal
    /// operation.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for cancelled operations.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Cancelled,
            error: error.into(),
        }
    }

    /// Creates an error for invalid arguments.
    ///
    /// Use when provided arguments don't meet validation requirements.
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::InvalidArgument,
            error: error.into(),
        }
    }

    /// Creates an error for failed media resolution.
    ///
    /// Use when the resolution endpoint reports errors in its envelope
    /// or returns no body at all. Carries all reported `code: message`
    /// pairs aggregated into one message.
    pub fn media_resolution<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::MediaResolution,
            error: error.into(),
        }
    }

    /// Creates an error for a missing preview URI.
    ///
    /// Fatal for the one playback attempt; a configuration failure, not
    /// a resolution failure.
    pub fn missing_preview<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::MissingPreview,
            error: error.into(),
        }
    }

    /// Creates an error for values outside valid range.
    ///
    /// Use when a value exceeds its allowed bounds, e.g. a seek target
    /// at or beyond the content length.
    pub fn out_of_range<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::OutOfRange,
            error: error.into(),
        }
    }

    /// Creates an error for wire format violations.
    ///
    /// Use when a response parses as JSON but misses fields the protocol
    /// requires. Distinct from errors the endpoint itself reports.
    pub fn protocol_violation<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::ProtocolViolation,
            error: error.into(),
        }
    }

    /// Creates an error for transport failures.
    ///
    /// Use for network failures during the resolution call or a range
    /// fetch. The session layer may retry the whole attempt; this crate
    /// does not retry internally.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Transport,
            error: error.into(),
        }
    }

    /// Creates an error for internal errors.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Internal,
            error: error.into(),
        }
    }
}

/// Returns the underlying error source.
///
/// This allows error chains to be examined for root causes.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error for display, showing both kind and details.
///
/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
///
/// Maps standard IO errors to their logical equivalents:
/// * `InvalidInput`/`InvalidData` -> `InvalidArgument`
/// * `UnexpectedEof` -> `OutOfRange`
/// * `Interrupted`/`WouldBlock` -> `Cancelled`
/// * everything else -> `Transport`
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            InvalidInput | InvalidData => Self::invalid_argument(err),
            UnexpectedEof => Self::out_of_range(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            _ => Self::transport(err),
        }
    }
}

/// Converts crate errors into IO errors so stream internals can surface
/// typed failures through `Read` and `Seek`.
///
/// Maps the kind onto the closest IO category:
/// * `OutOfRange` -> `UnexpectedEof`
/// * `InvalidArgument` -> `InvalidInput`
/// * `Cancelled` -> `Interrupted`
/// * `ProtocolViolation` -> `InvalidData`
/// * etc.
impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind {
            ErrorKind::OutOfRange => std::io::ErrorKind::UnexpectedEof,
            ErrorKind::InvalidArgument => std::io::ErrorKind::InvalidInput,
            ErrorKind::Cancelled => std::io::ErrorKind::Interrupted,
            ErrorKind::ProtocolViolation => std::io::ErrorKind::InvalidData,
            ErrorKind::MissingPreview | ErrorKind::MediaResolution => std::io::ErrorKind::NotFound,
            ErrorKind::Transport => std::io::ErrorKind::ConnectionAborted,
            ErrorKind::Internal => std::io::ErrorKind::Other,
        };
        Self::new(kind, err.error)
    }
}

/// Converts HTTP client errors into appropriate error kinds.
///
/// Maps HTTP errors based on their nature:
/// * Decode errors -> `ProtocolViolation`
/// * Builder errors -> `Internal`
/// * everything else (connect, timeout, body) -> `Transport`
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::protocol_violation(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        Self::transport(err)
    }
}

/// Converts JSON errors to `ProtocolViolation`.
///
/// A response that fails to parse is a malformed envelope, not a
/// transport failure.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::protocol_violation(err)
    }
}

/// Converts URL parsing errors to `InvalidArgument`.
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_argument(err)
    }
}
