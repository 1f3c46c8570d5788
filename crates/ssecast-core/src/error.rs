//! Shared error type across ssecast crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// No connected client with that id.
    UnknownRecipient,
    /// Client id already connected.
    Conflict,
    /// Recipient queue did not accept the event in time.
    Overloaded,
    /// Payload could not be framed.
    Unprocessable,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnknownRecipient => "UNKNOWN_RECIPIENT",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::Overloaded => "OVERLOADED",
            ClientCode::Unprocessable => "UNPROCESSABLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SseCastError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseCastError {
    /// Send or membership change aimed at a client that is not connected.
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),
    /// The message adapter or frame encoder rejected the payload.
    #[error("formatting failure: {0}")]
    FormattingFailure(String),
    /// Writing or flushing to the connection failed (client gone).
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// The sink cannot stream incrementally; nothing was registered.
    #[error("setup failure: {0}")]
    SetupFailure(String),
    #[error("client already connected: {0}")]
    DuplicateClient(String),
    #[error("group {0:?} is managed by the broker")]
    ReservedGroup(String),
    /// Full-channel policy gave up on this recipient.
    #[error("channel full: {0}")]
    ChannelFull(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SseCastError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SseCastError::UnknownRecipient(_) => ClientCode::UnknownRecipient,
            SseCastError::FormattingFailure(_) => ClientCode::Unprocessable,
            SseCastError::TransportFailure(_) => ClientCode::Internal,
            SseCastError::SetupFailure(_) => ClientCode::Internal,
            SseCastError::DuplicateClient(_) => ClientCode::Conflict,
            SseCastError::ReservedGroup(_) => ClientCode::BadRequest,
            SseCastError::ChannelFull(_) => ClientCode::Overloaded,
            SseCastError::BadRequest(_) => ClientCode::BadRequest,
            SseCastError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SseCastError::Internal(_) => ClientCode::Internal,
        }
    }
}
