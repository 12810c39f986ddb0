use crate::audio::{Alignment, AudioFormat, Base64EncodedAudioBytes};

/// `conversation_initiation_metadata` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationMetadataEvent {
    conversation_id: String,

    #[serde(default)]
    agent_output_audio_format: AudioFormat,

    #[serde(default)]
    user_input_audio_format: AudioFormat,
}

impl ConversationMetadataEvent {
    pub fn new(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            agent_output_audio_format: AudioFormat::default(),
            user_input_audio_format: AudioFormat::default(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn agent_output_audio_format(&self) -> &AudioFormat {
        &self.agent_output_audio_format
    }

    pub fn user_input_audio_format(&self) -> &AudioFormat {
        &self.user_input_audio_format
    }
}

/// `user_transcript` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserTranscriptEvent {
    user_transcript: String,
}

impl UserTranscriptEvent {
    pub fn new(transcript: &str) -> Self {
        Self {
            user_transcript: transcript.to_string(),
        }
    }

    pub fn transcript(&self) -> &str {
        &self.user_transcript
    }
}

/// `internal_tentative_agent_response` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TentativeAgentResponseEvent {
    tentative_agent_response: String,
}

impl TentativeAgentResponseEvent {
    pub fn response(&self) -> &str {
        &self.tentative_agent_response
    }
}

/// `agent_response` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentResponseEvent {
    agent_response: String,
}

impl AgentResponseEvent {
    pub fn new(response: &str) -> Self {
        Self {
            agent_response: response.to_string(),
        }
    }

    pub fn response(&self) -> &str {
        &self.agent_response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResponsePartType {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "delta")]
    Delta,
    #[serde(rename = "stop")]
    Stop,
}

/// One fragment of a streamed agent reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    text: String,

    #[serde(rename = "type")]
    part_type: ResponsePartType,
}

impl ResponsePart {
    pub fn new(text: &str, part_type: ResponsePartType) -> Self {
        Self {
            text: text.to_string(),
            part_type,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn part_type(&self) -> ResponsePartType {
        self.part_type
    }
}

/// `audio` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioEvent {
    /// PCM16 little-endian mono, base64 encoded
    audio_base_64: Base64EncodedAudioBytes,

    event_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    alignment: Option<Alignment>,
}

impl AudioEvent {
    pub fn new(audio_base_64: Base64EncodedAudioBytes, event_id: u64) -> Self {
        Self {
            audio_base_64,
            event_id,
            alignment: None,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn audio_base_64(&self) -> &str {
        &self.audio_base_64
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    pub fn alignment(&self) -> Option<&Alignment> {
        self.alignment.as_ref()
    }
}

/// `interruption` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InterruptionEvent {
    event_id: u64,
}

impl InterruptionEvent {
    pub fn new(event_id: u64) -> Self {
        Self { event_id }
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }
}

/// `ping` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PingEvent {
    event_id: u64,

    /// Round-trip latency measured by the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ping_ms: Option<u64>,
}

impl PingEvent {
    pub fn new(event_id: u64) -> Self {
        Self {
            event_id,
            ping_ms: None,
        }
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    pub fn ping_ms(&self) -> Option<u64> {
        self.ping_ms
    }
}
