//! Error kinds for the gateway core.
//!
//! Mirrors the error table of the AES67 gateway's error-handling design:
//! each variant maps to exactly one trigger and one recovery policy.

use thiserror::Error;

/// Errors surfaced by the gateway core.
///
/// `Cancelled` is deliberately not a variant here: cancellation is a clean
/// shutdown path, observed as a loop `break`, not an error.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// `configure()`/`start()` rejected: duplicate multicast endpoints, or a
    /// mutation attempted while the supervisor is running.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// NDI receiver creation failed during `start()`.
    #[error("NDI source unavailable: {0}")]
    SourceUnavailable(String),

    /// UDP send failed (RTP or SAP path).
    #[error("send failed: {0}")]
    SendFailed(#[from] std::io::Error),

    /// A fatal NDI stream event ended the audio sequence.
    #[error("fatal NDI stream event: {0}")]
    FatalStreamEvent(String),

    /// An audio frame didn't match the supported format (sample rate,
    /// channel count). Never actually constructed: the audio worker and the
    /// repacketizer both handle this by dropping the frame and continuing,
    /// per their drop-silently policy. Kept as a variant so the error table
    /// mirrors the documented trigger/recovery pairs 1:1.
    #[error("unsupported audio format: {0}")]
    FormatUnsupported(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
