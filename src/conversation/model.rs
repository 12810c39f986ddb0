use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;

use crate::conversation::startup::StartupState;
use crate::conversation::streaming::StreamingAssembler;
use crate::conversation::tools::ToolCallRegistry;
use crate::error::ConversationError;
use crate::types::audio::Alignment;
use crate::types::events::agent::ResponsePart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    UserEnded,
    RemoteDisconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Connecting,
    Active { agent_id: String },
    Ended(EndReason),
    Error(ConversationError),
}

impl ConversationState {
    pub fn is_active(&self) -> bool {
        matches!(self, ConversationState::Active { .. })
    }

    /// Whether `start_session` may leave this state.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ConversationState::Idle | ConversationState::Ended(_) | ConversationState::Error(_)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentActivity {
    #[default]
    Listening,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: u64,
    role: Role,
    content: String,
    timestamp: SystemTime,
    open: bool,
}

impl Message {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// True while a streamed agent reply still accepts deltas.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Append-only conversation transcript. Ids keep increasing across sessions
/// of the same conversation handle.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    /// Appends a message and returns its index.
    pub fn push(&mut self, role: Role, content: &str, open: bool) -> usize {
        self.next_id += 1;
        self.messages.push(Message {
            id: self.next_id,
            role,
            content: content.to_string(),
            timestamp: SystemTime::now(),
            open,
        });
        self.messages.len() - 1
    }

    pub(crate) fn append_text(&mut self, index: usize, text: &str) {
        if let Some(message) = self.messages.get_mut(index) {
            message.content.push_str(text);
        }
    }

    pub(crate) fn replace_text(&mut self, index: usize, text: &str) {
        if let Some(message) = self.messages.get_mut(index) {
            message.content = text.to_string();
        }
    }

    pub(crate) fn close(&mut self, index: usize) {
        if let Some(message) = self.messages.get_mut(index) {
            message.open = false;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Snapshot of one conversation, published to subscribers after every change.
#[derive(Debug, Clone)]
pub struct Session {
    state: ConversationState,
    messages: MessageLog,
    activity: AgentActivity,
    is_muted: bool,
    tool_calls: ToolCallRegistry,
    assembler: StreamingAssembler,
    latest_alignment: Option<Alignment>,
    conversation_id: Option<String>,
    startup_state: Option<StartupState>,
    /// Audio older than this interruption is stale.
    interrupted_event_id: Option<u64>,
    epoch: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            state: ConversationState::Idle,
            messages: MessageLog::default(),
            activity: AgentActivity::Listening,
            is_muted: false,
            tool_calls: ToolCallRegistry::new(),
            assembler: StreamingAssembler::new(),
            latest_alignment: None,
            conversation_id: None,
            startup_state: None,
            interrupted_event_id: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    pub fn agent_activity(&self) -> AgentActivity {
        self.activity
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn pending_tool_calls(&self) -> &ToolCallRegistry {
        &self.tool_calls
    }

    pub fn latest_audio_alignment(&self) -> Option<&Alignment> {
        self.latest_alignment.as_ref()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn startup_state(&self) -> Option<StartupState> {
        self.startup_state
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn set_state(&mut self, state: ConversationState) {
        if self.state != state {
            tracing::info!("conversation state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    pub(crate) fn set_activity(&mut self, activity: AgentActivity) -> bool {
        let changed = self.activity != activity;
        self.activity = activity;
        changed
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.is_muted = muted;
    }

    pub(crate) fn set_startup_state(&mut self, state: Option<StartupState>) {
        self.startup_state = state;
    }

    pub(crate) fn set_conversation_id(&mut self, id: &str) {
        self.conversation_id = Some(id.to_string());
    }

    pub(crate) fn set_alignment(&mut self, alignment: Alignment) {
        self.latest_alignment = Some(alignment);
    }

    pub(crate) fn interrupted_event_id(&self) -> Option<u64> {
        self.interrupted_event_id
    }

    pub(crate) fn set_interrupted_event_id(&mut self, event_id: u64) {
        self.interrupted_event_id = Some(event_id);
    }

    pub(crate) fn tool_calls_mut(&mut self) -> &mut ToolCallRegistry {
        &mut self.tool_calls
    }

    pub(crate) fn push_message(&mut self, role: Role, content: &str) {
        self.messages.push(role, content, false);
    }

    pub(crate) fn apply_part(&mut self, part: &ResponsePart) {
        self.assembler.apply(&mut self.messages, part);
    }

    /// Appends a final agent reply. A reply that repeats the streamed message
    /// it concludes replaces that message's text instead of duplicating it.
    pub(crate) fn record_agent_response(&mut self, text: &str) {
        if let Some(index) = self.assembler.take_open() {
            self.messages.replace_text(index, text);
            self.messages.close(index);
            return;
        }
        let repeats_last = self
            .messages
            .as_slice()
            .last()
            .is_some_and(|m| m.role() == Role::Agent && m.content() == text);
        if !repeats_last {
            self.messages.push(Role::Agent, text, false);
        }
    }

    /// Starts a new attempt: bumps the epoch and clears per-session data.
    /// The transcript is dropped too, message ids keep counting.
    pub(crate) fn begin_attempt(&mut self) -> u64 {
        self.epoch += 1;
        self.set_state(ConversationState::Connecting);
        self.messages.clear();
        self.activity = AgentActivity::Listening;
        self.is_muted = false;
        self.tool_calls.clear();
        self.assembler.reset();
        self.latest_alignment = None;
        self.conversation_id = None;
        self.startup_state = None;
        self.interrupted_event_id = None;
        self.epoch
    }

    /// Ends the current attempt: invalidates its background work and resets
    /// the transient flags. Messages stay readable.
    pub(crate) fn finish_attempt(&mut self, state: ConversationState) {
        self.epoch += 1;
        self.set_state(state);
        self.activity = AgentActivity::Listening;
        self.is_muted = false;
        self.tool_calls.clear();
        self.assembler.reset();
        self.startup_state = None;
    }
}

/// Single mutation point for a [`Session`]. Every change goes through a
/// closure run under the watch channel's lock, never across an `.await`.
#[derive(Clone)]
pub(crate) struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(Session::new())),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|session| out = Some(f(session)));
        match out {
            Some(out) => out,
            None => unreachable!("send_modify runs its closure exactly once"),
        }
    }

    /// Applies `f` only while `epoch` is still current; `None` otherwise.
    /// Subscribers are only notified when `f` ran.
    pub(crate) fn modify_if_current<R>(&self, epoch: u64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut out = None;
        self.tx.send_if_modified(|session| {
            if session.epoch != epoch {
                return false;
            }
            out = Some(f(session));
            true
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_increase_across_clears() {
        let mut log = MessageLog::default();
        log.push(Role::User, "a", false);
        log.push(Role::Agent, "b", false);
        let last = log.as_slice()[1].id();
        log.clear();
        log.push(Role::User, "c", false);
        assert!(log.as_slice()[0].id() > last);
    }

    #[test]
    fn stale_epoch_is_rejected() {
        let store = SessionStore::new();
        let epoch = store.modify(|s| s.begin_attempt());
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.modify(|s| s.finish_attempt(ConversationState::Ended(EndReason::UserEnded)));
        rx.borrow_and_update();

        let applied = store.modify_if_current(epoch, |s| s.set_activity(AgentActivity::Speaking));
        assert_eq!(applied, None);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.read(|s| s.agent_activity()), AgentActivity::Listening);
    }

    #[test]
    fn restart_allowed_only_from_terminal_states() {
        assert!(ConversationState::Idle.can_start());
        assert!(ConversationState::Ended(EndReason::RemoteDisconnected).can_start());
        assert!(ConversationState::Error(ConversationError::AgentTimeout).can_start());
        assert!(!ConversationState::Connecting.can_start());
        assert!(!ConversationState::Active { agent_id: "a".into() }.can_start());
    }
}
