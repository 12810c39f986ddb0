/// `user_message` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserMessageEvent {
    /// The text typed by the user
    text: String,
}

impl UserMessageEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `contextual_update` event: background information that does not
/// prompt a reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContextualUpdateEvent {
    text: String,
}

impl ContextualUpdateEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `pong` event, echoes the id of the `ping` it answers
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PongEvent {
    event_id: u64,
}

impl PongEvent {
    pub fn new(event_id: u64) -> Self {
        Self { event_id }
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FeedbackScore {
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "dislike")]
    Dislike,
}

/// `feedback` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeedbackEvent {
    score: FeedbackScore,

    /// The agent event the feedback refers to
    event_id: u64,
}

impl FeedbackEvent {
    pub fn new(score: FeedbackScore, event_id: u64) -> Self {
        Self { score, event_id }
    }

    pub fn score(&self) -> FeedbackScore {
        self.score
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }
}

/// `client_tool_result` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientToolResultEvent {
    tool_call_id: String,
    result: serde_json::Value,
    is_error: bool,
}

impl ClientToolResultEvent {
    pub fn new(tool_call_id: &str, result: serde_json::Value, is_error: bool) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            result,
            is_error,
        }
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn result(&self) -> &serde_json::Value {
        &self.result
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}
