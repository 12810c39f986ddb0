use std::collections::BTreeMap;

/// Payload of the `conversation_initiation_client_data` event: everything the
/// client negotiates with the agent before the first turn.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationInitiationData {
    /// Per-conversation overrides of the agent configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_config_override: Option<ConversationConfigOverride>,

    /// Extra body forwarded verbatim to a custom LLM.
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_llm_extra_body: Option<serde_json::Value>,

    /// Values substituted into `{{placeholders}}` of the agent prompt.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dynamic_variables: BTreeMap<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl ConversationInitiationData {
    pub fn conversation_config_override(&self) -> Option<&ConversationConfigOverride> {
        self.conversation_config_override.as_ref()
    }

    pub fn custom_llm_extra_body(&self) -> Option<&serde_json::Value> {
        self.custom_llm_extra_body.as_ref()
    }

    pub fn dynamic_variables(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.dynamic_variables
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Whether the conversation was negotiated as text only (no audio).
    pub fn is_text_only(&self) -> bool {
        self.conversation_config_override
            .as_ref()
            .and_then(|o| o.conversation.as_ref())
            .is_some_and(|c| c.text_only)
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationConfigOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<AgentOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tts: Option<TtsOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation: Option<ConversationOverride>,
}

impl ConversationConfigOverride {
    pub fn agent(&self) -> Option<&AgentOverride> {
        self.agent.as_ref()
    }

    pub fn tts(&self) -> Option<&TtsOverride> {
        self.tts.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<PromptOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_message: Option<String>,
    /// ex: "en"
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl AgentOverride {
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_ref().map(|p| p.prompt.as_str())
    }

    pub fn first_message(&self) -> Option<&str> {
        self.first_message.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PromptOverride {
    prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TtsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<String>,
}

impl TtsOverride {
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationOverride {
    text_only: bool,
}

pub struct ConversationInitiation {
    data: ConversationInitiationData,
}

impl Default for ConversationInitiation {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationInitiation {
    pub fn new() -> Self {
        Self {
            data: ConversationInitiationData::default(),
        }
    }

    fn overrides(&mut self) -> &mut ConversationConfigOverride {
        self.data
            .conversation_config_override
            .get_or_insert_with(ConversationConfigOverride::default)
    }

    fn agent(&mut self) -> &mut AgentOverride {
        self.overrides().agent.get_or_insert_with(AgentOverride::default)
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.agent().prompt = Some(PromptOverride {
            prompt: prompt.to_string(),
        });
        self
    }

    pub fn with_first_message(mut self, first_message: &str) -> Self {
        self.agent().first_message = Some(first_message.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.agent().language = Some(language.to_string());
        self
    }

    pub fn with_voice_id(mut self, voice_id: &str) -> Self {
        self.overrides().tts = Some(TtsOverride {
            voice_id: Some(voice_id.to_string()),
        });
        self
    }

    pub fn with_text_only(mut self, text_only: bool) -> Self {
        self.overrides().conversation = Some(ConversationOverride { text_only });
        self
    }

    pub fn with_custom_llm_extra_body(mut self, body: serde_json::Value) -> Self {
        self.data.custom_llm_extra_body = Some(body);
        self
    }

    pub fn with_dynamic_variable(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.dynamic_variables.insert(name.to_string(), value.into());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.data.user_id = Some(user_id.to_string());
        self
    }

    pub fn build(self) -> ConversationInitiationData {
        self.data
    }
}
