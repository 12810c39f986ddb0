use std::time::Duration;

use crate::consts::*;
use crate::error::ConfigError;
use crate::transport::TokenOverrides;
use crate::types::tools::END_CALL_TOOL_NAME;
use crate::types::{ConversationInitiation, ConversationInitiationData};

/// Quiet periods after which a speaking agent is considered listening again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityTimings {
    pub text_quiet: Duration,
    pub audio_quiet: Duration,
}

impl Default for ActivityTimings {
    fn default() -> Self {
        Self {
            text_quiet: DEFAULT_TEXT_QUIET,
            audio_quiet: DEFAULT_AUDIO_QUIET,
        }
    }
}

/// Per-step limits of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupTimeouts {
    pub token: Duration,
    pub connect: Duration,
    /// Grace period for the agent to join after the room is connected.
    pub agent_ready: Duration,
}

impl Default for StartupTimeouts {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN_TIMEOUT,
            connect: DEFAULT_CONNECT_TIMEOUT,
            agent_ready: DEFAULT_AGENT_READY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    activity: ActivityTimings,
    timeouts: StartupTimeouts,
    end_call_tool_name: String,
    channel_capacity: usize,
}

pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::new(),
        }
    }

    pub fn with_text_quiet(mut self, quiet: Duration) -> Self {
        self.config.activity.text_quiet = quiet;
        self
    }

    pub fn with_audio_quiet(mut self, quiet: Duration) -> Self {
        self.config.activity.audio_quiet = quiet;
        self
    }

    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.token = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.connect = timeout;
        self
    }

    pub fn with_agent_ready_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.agent_ready = timeout;
        self
    }

    pub fn with_end_call_tool_name(mut self, name: &str) -> Self {
        self.config.end_call_tool_name = name.to_string();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            activity: ActivityTimings::default(),
            timeouts: StartupTimeouts::default(),
            end_call_tool_name: END_CALL_TOOL_NAME.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Reads overrides from `CONVAI_*` environment variables; unset ones keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let millis = |name: &'static str| -> Result<Option<Duration>, ConfigError> {
            match lookup(name) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(|ms| Some(Duration::from_millis(ms)))
                    .map_err(|_| ConfigError::InvalidDuration { name, value }),
            }
        };

        let mut config = Self::new();
        if let Some(quiet) = millis(TEXT_QUIET_MS)? {
            config.activity.text_quiet = quiet;
        }
        if let Some(quiet) = millis(AUDIO_QUIET_MS)? {
            config.activity.audio_quiet = quiet;
        }
        if let Some(timeout) = millis(TOKEN_TIMEOUT_MS)? {
            config.timeouts.token = timeout;
        }
        if let Some(timeout) = millis(CONNECT_TIMEOUT_MS)? {
            config.timeouts.connect = timeout;
        }
        if let Some(timeout) = millis(AGENT_READY_TIMEOUT_MS)? {
            config.timeouts.agent_ready = timeout;
        }
        if let Some(name) = lookup(END_CALL_TOOL) {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Empty { name: END_CALL_TOOL });
            }
            config.end_call_tool_name = name.to_string();
        }
        Ok(config)
    }

    pub fn activity(&self) -> &ActivityTimings {
        &self.activity
    }

    pub fn timeouts(&self) -> &StartupTimeouts {
        &self.timeouts
    }

    pub fn end_call_tool_name(&self) -> &str {
        &self.end_call_tool_name
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }
}

/// What to negotiate for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    initiation: ConversationInitiationData,
    token_overrides: TokenOverrides,
    microphone: Option<bool>,
}

impl ConversationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the conversation-init payload built with [`ConversationInitiation`].
    pub fn with_initiation(mut self, initiation: ConversationInitiationData) -> Self {
        self.initiation = initiation;
        self
    }

    pub fn with_token_overrides(mut self, overrides: TokenOverrides) -> Self {
        self.token_overrides = overrides;
        self
    }

    pub fn with_microphone(mut self, enabled: bool) -> Self {
        self.microphone = Some(enabled);
        self
    }

    pub fn initiation(&self) -> &ConversationInitiationData {
        &self.initiation
    }

    pub fn token_overrides(&self) -> &TokenOverrides {
        &self.token_overrides
    }

    /// Explicit setting, otherwise on unless the conversation is text only.
    pub fn microphone_enabled(&self) -> bool {
        self.microphone
            .unwrap_or_else(|| !self.initiation.is_text_only())
    }
}

impl From<ConversationInitiation> for ConversationOptions {
    fn from(initiation: ConversationInitiation) -> Self {
        Self::new().with_initiation(initiation.build())
    }
}
