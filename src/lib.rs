//! Client-side session engine for conversational agents.
//!
//! A [`Conversation`] drives one agent session over a [`Transport`]: it runs
//! the startup sequence, consumes the agent's JSON events, keeps the
//! transcript and pending tool calls, and feeds agent audio to a playback
//! processor from the `utils` crate.

pub mod codec;
mod consts;
pub mod conversation;
pub mod error;
pub mod transport;

pub use convai_session_types as types;
pub use convai_session_utils as utils;

pub use conversation::{
    Conversation, ConversationOptions, ConversationState, Dependencies, SessionConfig,
};
pub use error::{ConversationError, ProtocolError};
pub use transport::websocket::WebSocketTransport;
pub use transport::{PublicAgentTokenProvider, TokenProvider, Transport};
