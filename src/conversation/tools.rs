use crate::error::ToolCallError;
use crate::types::events::client::ClientToolResultEvent;
use crate::types::tools::ClientToolCall;

/// A tool invocation the agent is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    tool_call_id: String,
    tool_name: String,
    parameters: serde_json::Value,
    event_id: Option<u64>,
    expects_response: bool,
}

impl ToolCall {
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
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

impl From<ClientToolCall> for ToolCall {
    fn from(call: ClientToolCall) -> Self {
        Self {
            tool_call_id: call.tool_call_id().to_string(),
            tool_name: call.tool_name().to_string(),
            parameters: call.parameters().clone(),
            event_id: call.event_id(),
            expects_response: call.expects_response(),
        }
    }
}

/// Pending tool calls keyed by id, enumerated in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ToolCallRegistry {
    calls: Vec<ToolCall>,
}

impl ToolCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, call: ToolCall) -> Result<(), ToolCallError> {
        if self.contains(&call.tool_call_id) {
            return Err(ToolCallError::Duplicate(call.tool_call_id));
        }
        self.calls.push(call);
        Ok(())
    }

    /// Removes the pending call and builds the `client_tool_result` answering it.
    pub fn resolve(
        &mut self,
        tool_call_id: &str,
        result: serde_json::Value,
        is_error: bool,
    ) -> Result<(ToolCall, ClientToolResultEvent), ToolCallError> {
        let index = self
            .calls
            .iter()
            .position(|c| c.tool_call_id == tool_call_id)
            .ok_or_else(|| ToolCallError::Unknown(tool_call_id.to_string()))?;
        let call = self.calls.remove(index);
        let event = ClientToolResultEvent::new(&call.tool_call_id, result, is_error);
        Ok((call, event))
    }

    /// Puts a resolved call back at its original position.
    pub(crate) fn restore(&mut self, index_hint: usize, call: ToolCall) {
        if self.contains(&call.tool_call_id) {
            return;
        }
        let index = index_hint.min(self.calls.len());
        self.calls.insert(index, call);
    }

    pub fn position(&self, tool_call_id: &str) -> Option<usize> {
        self.calls.iter().position(|c| c.tool_call_id == tool_call_id)
    }

    pub fn get(&self, tool_call_id: &str) -> Option<&ToolCall> {
        self.calls.iter().find(|c| c.tool_call_id == tool_call_id)
    }

    pub fn contains(&self, tool_call_id: &str) -> bool {
        self.get(tool_call_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolCall> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}
