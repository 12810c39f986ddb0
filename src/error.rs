use thiserror::Error;

/// Errors surfaced to callers of the [`Conversation`](crate::Conversation) API.
///
/// None of these are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("no active conversation")]
    NotConnected,
    #[error("a conversation is already active")]
    AlreadyActive,
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("agent did not become ready in time")]
    AgentTimeout,
    #[error("failed to toggle microphone: {0}")]
    MicrophoneToggleFailed(String),
    #[error("unknown tool call: {0}")]
    UnknownToolCall(String),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<TokenError> for ConversationError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::AuthenticationFailed(message) => ConversationError::AuthenticationFailed(message),
            other => ConversationError::ConnectionFailed(other.to_string()),
        }
    }
}

impl From<ConnectionError> for ConversationError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotConnected => ConversationError::NotConnected,
            ConnectionError::Failed(cause) => ConversationError::ConnectionFailed(cause),
        }
    }
}

/// An inbound frame that could not be decoded into a known event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Failures of the credential collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token endpoint url")]
    InvalidUrl,
    #[error("invalid response from token endpoint")]
    InvalidResponse,
    #[error("token endpoint returned HTTP {0}")]
    HttpError(u16),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("token response did not contain a usable token")]
    InvalidTokenResponse,
}

/// Failures of the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    #[error("tool call {0} is already pending")]
    Duplicate(String),
    #[error("no pending tool call {0}")]
    Unknown(String),
}

/// Invalid `SessionConfig` environment values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a number of milliseconds, got {value:?}")]
    InvalidDuration { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}
