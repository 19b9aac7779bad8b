//! Error types for conference operations
//!
//! Every caller-facing failure is a [`ConferenceError`] delivered through the
//! client's dispatch queue. Wire payload faults are described by
//! [`ParseError`]; they are logged and the offending fragment is dropped. An
//! unusable join snapshot is reported as [`ConferenceError::RemoteFailure`].

use thiserror::Error;

/// Result type for conference operations
pub type ConferenceResult<T> = Result<T, ConferenceError>;

/// Errors reported to continuations of conference operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConferenceError {
    /// Join was requested while a conference is already joined or joining
    #[error("Already connected to conference server")]
    AlreadyConnected,

    /// The operation requires a joined conference
    #[error("Conference server is not connected")]
    NotConnected,

    /// A required handle was absent or an enum value was not recognized
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Unknown session or stream id
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The stream was never advertised or has since been removed
    #[error("Unknown stream {stream_id}, check whether this stream is removed")]
    UnknownStream { stream_id: String },

    /// Malformed wire payload
    #[error("Parse failure: {message}")]
    ParseFailure { message: String },

    /// The server or a channel reported an operational error
    #[error("Remote failure: {message}")]
    RemoteFailure { message: String },
}

/// Category of a [`ConferenceError`], without its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyConnected,
    NotConnected,
    InvalidArgument,
    NotFound,
    UnknownStream,
    ParseFailure,
    RemoteFailure,
}

impl ConferenceError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an unknown stream error
    pub fn unknown_stream(stream_id: impl Into<String>) -> Self {
        Self::UnknownStream {
            stream_id: stream_id.into(),
        }
    }

    /// Create a remote failure error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            message: message.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyConnected => ErrorKind::AlreadyConnected,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnknownStream { .. } => ErrorKind::UnknownStream,
            Self::ParseFailure { .. } => ErrorKind::ParseFailure,
            Self::RemoteFailure { .. } => ErrorKind::RemoteFailure,
        }
    }
}

/// Structural fault found while decoding a wire payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A required member is absent
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// A member is present but has the wrong JSON type
    #[error("field `{field}` is not {expected}")]
    WrongType { field: String, expected: &'static str },

    /// A member has the right type but an unusable value
    #[error("field `{field}` has invalid value `{value}`")]
    InvalidValue { field: String, value: String },

    /// Stream type other than `mixed` or `forward`
    #[error("unsupported stream type `{0}`")]
    UnsupportedStreamType(String),
}

impl ParseError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub(crate) fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
        }
    }
}

impl From<ParseError> for ConferenceError {
    fn from(e: ParseError) -> Self {
        ConferenceError::ParseFailure {
            message: e.to_string(),
        }
    }
}
