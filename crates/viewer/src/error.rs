use layers::UnknownLayer;
use streaming::{PendingFull, ProtocolError, StreamError};

use crate::engine::EngineError;
use crate::fetch::FetchError;
use crate::session::SessionState;

#[derive(Debug)]
pub enum SessionError {
    /// The operation needs an initialized engine.
    NotReady { state: SessionState },
    AlreadyActivated { state: SessionState },
    Disposed,
    /// The session was disposed while the operation was waiting.
    Cancelled,
    BufferFull(PendingFull),
    UnknownLayer(UnknownLayer),
    Stream(StreamError),
    Protocol(ProtocolError),
    Fetch(FetchError),
    InvalidDocument {
        location: String,
        source: serde_json::Error,
    },
    Engine(EngineError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotReady { state } => write!(f, "viewer not ready (state: {state:?})"),
            SessionError::AlreadyActivated { state } => {
                write!(f, "viewer already activated (state: {state:?})")
            }
            SessionError::Disposed => write!(f, "viewer disposed"),
            SessionError::Cancelled => write!(f, "operation cancelled by dispose"),
            SessionError::BufferFull(err) => write!(f, "{err}"),
            SessionError::UnknownLayer(err) => write!(f, "{err}"),
            SessionError::Stream(err) => write!(f, "{err}"),
            SessionError::Protocol(err) => write!(f, "{err}"),
            SessionError::Fetch(err) => write!(f, "{err}"),
            SessionError::InvalidDocument { location, source } => {
                write!(f, "document at {location} is not valid JSON: {source}")
            }
            SessionError::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::BufferFull(err) => Some(err),
            SessionError::UnknownLayer(err) => Some(err),
            SessionError::Stream(err) => Some(err),
            SessionError::Protocol(err) => Some(err),
            SessionError::Fetch(err) => Some(err),
            SessionError::InvalidDocument { source, .. } => Some(source),
            SessionError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PendingFull> for SessionError {
    fn from(err: PendingFull) -> Self {
        SessionError::BufferFull(err)
    }
}

impl From<UnknownLayer> for SessionError {
    fn from(err: UnknownLayer) -> Self {
        SessionError::UnknownLayer(err)
    }
}

impl From<StreamError> for SessionError {
    fn from(err: StreamError) -> Self {
        SessionError::Stream(err)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        SessionError::Protocol(err)
    }
}

impl From<FetchError> for SessionError {
    fn from(err: FetchError) -> Self {
        SessionError::Fetch(err)
    }
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        SessionError::Engine(err)
    }
}
