use std::time::Duration;

pub const DEFAULT_CONVAI_WS_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";
pub const DEFAULT_SOURCE: &str = "rust_sdk";
pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const AUTHORIZATION_HEADER: &str = "Authorization";

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub const DEFAULT_TEXT_QUIET: Duration = Duration::from_millis(500);
pub const DEFAULT_AUDIO_QUIET: Duration = Duration::from_millis(800);

pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_AGENT_READY_TIMEOUT: Duration = Duration::from_secs(3);

pub const TEXT_QUIET_MS: &str = "CONVAI_TEXT_QUIET_MS";
pub const AUDIO_QUIET_MS: &str = "CONVAI_AUDIO_QUIET_MS";
pub const TOKEN_TIMEOUT_MS: &str = "CONVAI_TOKEN_TIMEOUT_MS";
pub const CONNECT_TIMEOUT_MS: &str = "CONVAI_CONNECT_TIMEOUT_MS";
pub const AGENT_READY_TIMEOUT_MS: &str = "CONVAI_AGENT_READY_TIMEOUT_MS";
pub const END_CALL_TOOL: &str = "CONVAI_END_CALL_TOOL";
