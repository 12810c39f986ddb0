pub mod agent;
pub mod client;

use crate::tools::{AgentToolResponse, ClientToolCall};
use agent::*;
use client::*;

/// Frame types the agent may send that carry nothing a client session acts on.
pub const IGNORED_AGENT_EVENT_TYPES: &[&str] = &[
    "vad_score",
    "internal_vad_score",
    "internal_turn_probability",
    "agent_response_correction",
    "asr_initiation_metadata",
    "mcp_tool_call",
    "mcp_connection_status",
    "agent_tool_request",
];

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "conversation_initiation_client_data")]
    ConversationInitiation(crate::ConversationInitiationData),
    #[serde(rename = "user_message")]
    UserMessage(UserMessageEvent),
    #[serde(rename = "contextual_update")]
    ContextualUpdate(ContextualUpdateEvent),
    #[serde(rename = "user_activity")]
    UserActivity,
    #[serde(rename = "pong")]
    Pong(PongEvent),
    #[serde(rename = "feedback")]
    Feedback(FeedbackEvent),
    #[serde(rename = "client_tool_result")]
    ClientToolResult(ClientToolResultEvent),
}

impl ClientEvent {
    /// The wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::ConversationInitiation(_) => "conversation_initiation_client_data",
            ClientEvent::UserMessage(_) => "user_message",
            ClientEvent::ContextualUpdate(_) => "contextual_update",
            ClientEvent::UserActivity => "user_activity",
            ClientEvent::Pong(_) => "pong",
            ClientEvent::Feedback(_) => "feedback",
            ClientEvent::ClientToolResult(_) => "client_tool_result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "conversation_initiation_metadata")]
    ConversationMetadata {
        #[serde(rename = "conversation_initiation_metadata_event")]
        event: ConversationMetadataEvent,
    },
    #[serde(rename = "user_transcript")]
    UserTranscript {
        #[serde(rename = "user_transcription_event")]
        event: UserTranscriptEvent,
    },
    #[serde(rename = "internal_tentative_agent_response")]
    TentativeAgentResponse {
        #[serde(rename = "tentative_agent_response_internal_event")]
        event: TentativeAgentResponseEvent,
    },
    #[serde(rename = "agent_response")]
    AgentResponse {
        #[serde(rename = "agent_response_event")]
        event: AgentResponseEvent,
    },
    #[serde(rename = "agent_chat_response_part")]
    AgentChatResponsePart {
        #[serde(rename = "text_response_part")]
        part: ResponsePart,
    },
    #[serde(rename = "audio")]
    Audio {
        #[serde(rename = "audio_event")]
        event: AudioEvent,
    },
    #[serde(rename = "interruption")]
    Interruption {
        #[serde(rename = "interruption_event")]
        event: InterruptionEvent,
    },
    #[serde(rename = "ping")]
    Ping {
        #[serde(rename = "ping_event")]
        event: PingEvent,
    },
    #[serde(rename = "client_tool_call")]
    ClientToolCall {
        #[serde(rename = "client_tool_call")]
        call: ClientToolCall,
    },
    #[serde(rename = "agent_tool_response")]
    AgentToolResponse {
        #[serde(rename = "agent_tool_response")]
        response: AgentToolResponse,
    },
}

impl AgentEvent {
    /// The wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::ConversationMetadata { .. } => "conversation_initiation_metadata",
            AgentEvent::UserTranscript { .. } => "user_transcript",
            AgentEvent::TentativeAgentResponse { .. } => "internal_tentative_agent_response",
            AgentEvent::AgentResponse { .. } => "agent_response",
            AgentEvent::AgentChatResponsePart { .. } => "agent_chat_response_part",
            AgentEvent::Audio { .. } => "audio",
            AgentEvent::Interruption { .. } => "interruption",
            AgentEvent::Ping { .. } => "ping",
            AgentEvent::ClientToolCall { .. } => "client_tool_call",
            AgentEvent::AgentToolResponse { .. } => "agent_tool_response",
        }
    }
}
