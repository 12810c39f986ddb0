use crate::error::ProtocolError;
use crate::types::events::IGNORED_AGENT_EVENT_TYPES;
use crate::types::{AgentEvent, ClientEvent};

/// Decodes one inbound data-channel payload.
///
/// Returns `Ok(None)` for frame types the agent sends that a client session
/// does not act on.
pub fn parse_incoming(payload: &[u8]) -> Result<Option<AgentEvent>, ProtocolError> {
    let json: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|e| ProtocolError::Malformed(format!("invalid json: {e}")))?;

    let event_type = json
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| ProtocolError::Malformed("missing `type` discriminator".to_string()))?;

    if IGNORED_AGENT_EVENT_TYPES.contains(&event_type.as_str()) {
        tracing::trace!("ignoring frame: {}", event_type);
        return Ok(None);
    }

    let event: AgentEvent = serde_json::from_value(json)
        .map_err(|e| ProtocolError::Malformed(format!("{event_type}: {e}")))?;

    if let AgentEvent::Audio { event: audio } = &event {
        if let Some(alignment) = audio.alignment() {
            if !alignment.is_consistent() {
                return Err(ProtocolError::Malformed(format!(
                    "audio {}: alignment arrays differ in length",
                    audio.event_id()
                )));
            }
        }
    }

    Ok(Some(event))
}

/// Encodes one outbound event as a JSON text payload.
pub fn serialize_outgoing(event: &ClientEvent) -> Vec<u8> {
    match serde_json::to_vec(event) {
        Ok(bytes) => bytes,
        Err(e) => {
            // Only reachable through non-string map keys in user supplied JSON values.
            tracing::error!("failed to serialize event: {}, type={}", e, event.kind());
            serde_json::json!({ "type": event.kind() }).to_string().into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::audio::Alignment;
    use crate::types::events::agent::ResponsePartType;
    use crate::types::events::client::{PongEvent, UserMessageEvent};
    use crate::types::ConversationInitiation;

    #[test]
    fn parses_ping() {
        let frame = br#"{"type":"ping","ping_event":{"event_id":42,"ping_ms":120}}"#;
        match parse_incoming(frame).unwrap() {
            Some(AgentEvent::Ping { event }) => {
                assert_eq!(event.event_id(), 42);
                assert_eq!(event.ping_ms(), Some(120));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_audio_with_alignment() {
        let frame = br#"{
            "type": "audio",
            "audio_event": {
                "audio_base_64": "AAA=",
                "event_id": 3,
                "alignment": {
                    "chars": ["h", "i"],
                    "char_start_times_ms": [0, 40],
                    "char_durations_ms": [40, 50]
                }
            }
        }"#;
        match parse_incoming(frame).unwrap() {
            Some(AgentEvent::Audio { event }) => {
                assert_eq!(event.event_id(), 3);
                assert_eq!(event.alignment().map(Alignment::text), Some("hi".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unequal_alignment_is_malformed() {
        let frame = br#"{
            "type": "audio",
            "audio_event": {
                "audio_base_64": "",
                "event_id": 1,
                "alignment": {"chars": ["a"], "char_start_times_ms": [], "char_durations_ms": [1]}
            }
        }"#;
        assert!(matches!(parse_incoming(frame), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn ignored_types_are_not_errors() {
        let frame = br#"{"type":"vad_score","vad_score_event":{"vad_score":0.4}}"#;
        assert_eq!(parse_incoming(frame), Ok(None));
    }

    #[test]
    fn unknown_and_broken_frames_are_malformed() {
        assert!(parse_incoming(b"not json").is_err());
        assert!(parse_incoming(br#"{"no_type":true}"#).is_err());
        assert!(parse_incoming(br#"{"type":"something_new"}"#).is_err());
        assert!(parse_incoming(br#"{"type":"ping","ping_event":{}}"#).is_err());
    }

    #[test]
    fn parses_tool_call_defaults() {
        let frame = br#"{
            "type": "client_tool_call",
            "client_tool_call": {"tool_name": "lookup", "tool_call_id": "t1", "parameters": {"q": "x"}}
        }"#;
        match parse_incoming(frame).unwrap() {
            Some(AgentEvent::ClientToolCall { call }) => {
                assert_eq!(call.tool_call_id(), "t1");
                assert_eq!(call.event_id(), None);
                assert!(call.expects_response());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_stop_part_without_text() {
        let frame = br#"{"type":"agent_chat_response_part","text_response_part":{"type":"stop"}}"#;
        match parse_incoming(frame).unwrap() {
            Some(AgentEvent::AgentChatResponsePart { part }) => {
                assert_eq!(part.text(), "");
                assert_eq!(part.part_type(), ResponsePartType::Stop);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn serializes_outgoing_events() {
        let pong = serialize_outgoing(&ClientEvent::Pong(PongEvent::new(9)));
        let json: serde_json::Value = serde_json::from_slice(&pong).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong", "event_id": 9}));

        let message = serialize_outgoing(&ClientEvent::UserMessage(UserMessageEvent::new("hi")));
        let json: serde_json::Value = serde_json::from_slice(&message).unwrap();
        assert_eq!(json, serde_json::json!({"type": "user_message", "text": "hi"}));
    }

    #[test]
    fn serializes_initiation_overrides() {
        let data = ConversationInitiation::new()
            .with_first_message("Hi there")
            .with_text_only(true)
            .with_dynamic_variable("name", "Ada")
            .build();
        let bytes = serialize_outgoing(&ClientEvent::ConversationInitiation(data));
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "conversation_initiation_client_data");
        assert_eq!(
            json["conversation_config_override"]["agent"]["first_message"],
            "Hi there"
        );
        assert_eq!(
            json["conversation_config_override"]["conversation"]["text_only"],
            true
        );
        assert_eq!(json["dynamic_variables"]["name"], "Ada");
    }
}
