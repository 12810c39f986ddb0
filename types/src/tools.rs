/// Name of the system tool the agent invokes to hang up.
pub const END_CALL_TOOL_NAME: &str = "end_call";

fn expects_response_default() -> bool {
    true
}

/// `client_tool_call` payload: the agent asks the client to run a tool.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientToolCall {
    /// The name of the tool to run
    tool_name: String,

    /// Correlation id echoed back in the `client_tool_result`
    tool_call_id: String,

    /// Tool arguments as a JSON object
    #[serde(default)]
    parameters: serde_json::Value,

    #[serde(default)]
    event_id: Option<u64>,

    #[serde(default = "expects_response_default")]
    expects_response: bool,
}

impl ClientToolCall {
    pub fn new(tool_name: &str, tool_call_id: &str, parameters: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            tool_call_id: tool_call_id.to_string(),
            parameters,
            event_id: None,
            expects_response: true,
        }
    }

    pub fn with_event_id(mut self, event_id: u64) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    pub fn event_id(&self) -> Option<u64> {
        self.event_id
    }

    pub fn expects_response(&self) -> bool {
        self.expects_response
    }
}

/// `agent_tool_response` payload: the agent reports a tool it ran itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentToolResponse {
    tool_name: String,
    tool_call_id: String,
    /// "system", "client", "webhook", ...
    #[serde(default)]
    tool_type: String,
    #[serde(default)]
    is_error: bool,
}

impl AgentToolResponse {
    pub fn new(tool_name: &str, tool_call_id: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            tool_call_id: tool_call_id.to_string(),
            tool_type: "system".to_string(),
            is_error: false,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn tool_type(&self) -> &str {
        &self.tool_type
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}
