use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use secrecy::SecretString;

use crate::consts::{DEFAULT_CONVAI_WS_URL, DEFAULT_SOURCE, DEFAULT_VERSION};
use crate::error::{ConnectionError, PublishError, TokenError};

pub mod websocket;

/// Raw data-channel payloads, in arrival order.
pub type InboundStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;
pub type ConnectionStateStream = Pin<Box<dyn Stream<Item = ConnectionState> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Where and how to connect, as resolved by a [`TokenProvider`].
#[derive(Debug)]
pub struct ConnectionDetails {
    server_url: String,
    token: Option<SecretString>,
}

impl ConnectionDetails {
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(SecretString::from(token.to_string()));
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }
}

/// Per-session adjustments to the credential request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenOverrides {
    base_url: Option<String>,
    source: Option<String>,
    version: Option<String>,
}

impl TokenOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// The real-time room the session runs over.
///
/// `inbound` and `connection_states` hand out the streams of the current
/// connection. Items that arrive between `connect` and the call are buffered,
/// and the streams end when the connection closes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, details: &ConnectionDetails, enable_microphone: bool) -> Result<(), ConnectionError>;

    async fn disconnect(&self);

    fn inbound(&self) -> InboundStream;

    fn connection_states(&self) -> ConnectionStateStream;

    async fn publish(&self, payload: Bytes, reliable: bool) -> Result<(), PublishError>;

    /// Resolves once the remote agent has joined the room.
    async fn wait_for_agent_ready(&self);

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), ConnectionError>;

    fn is_microphone_enabled(&self) -> bool;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_connection_details(
        &self,
        agent_id: &str,
        overrides: &TokenOverrides,
    ) -> Result<ConnectionDetails, TokenError>;
}

/// Resolves connection details for public agents, which need no credential:
/// the agent id travels in the URL query.
#[derive(Debug, Clone)]
pub struct PublicAgentTokenProvider {
    base_url: String,
}

impl Default for PublicAgentTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CONVAI_WS_URL)
    }
}

impl PublicAgentTokenProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, agent_id: &str, overrides: &TokenOverrides) -> Result<String, TokenError> {
        let valid_id = !agent_id.is_empty()
            && agent_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_id {
            return Err(TokenError::InvalidUrl);
        }

        let base = overrides
            .base_url()
            .map(|b| b.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        if !(base.starts_with("wss://") || base.starts_with("ws://")) {
            return Err(TokenError::InvalidUrl);
        }

        Ok(format!(
            "{}?agent_id={}&source={}&version={}",
            base,
            agent_id,
            overrides.source().unwrap_or(DEFAULT_SOURCE),
            overrides.version().unwrap_or(DEFAULT_VERSION),
        ))
    }
}

#[async_trait]
impl TokenProvider for PublicAgentTokenProvider {
    async fn fetch_connection_details(
        &self,
        agent_id: &str,
        overrides: &TokenOverrides,
    ) -> Result<ConnectionDetails, TokenError> {
        let url = self.url_for(agent_id, overrides)?;
        tracing::debug!(agent_id, "resolved public agent url");
        Ok(ConnectionDetails::new(&url))
    }
}
