use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt as _;
use tokio::time::{sleep_until, Instant};

use crate::codec::{parse_incoming, serialize_outgoing};
use crate::conversation::config::ActivityTimings;
use crate::conversation::model::{AgentActivity, ConversationState, EndReason, Role, Session, SessionStore};
use crate::conversation::stats::SessionStats;
use crate::conversation::tools::ToolCall;
use crate::transport::{ConnectionState, ConnectionStateStream, InboundStream, Transport};
use crate::types::events::agent::AudioEvent;
use crate::types::events::client::PongEvent;
use crate::types::{AgentEvent, ClientEvent};
use crate::utils::audio::decode_pcm16;
use crate::utils::playback::{PlaybackError, PlaybackHandle};

/// Per-session consumer of inbound frames and connection-state changes.
///
/// Every mutation is tagged with the epoch the loop was started for, so a loop
/// that outlives its session cannot touch the next one.
pub(crate) struct EventLoop {
    pub(crate) store: SessionStore,
    pub(crate) epoch: u64,
    pub(crate) agent_id: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) playback: Option<Arc<Mutex<PlaybackHandle>>>,
    pub(crate) stats: Arc<Mutex<SessionStats>>,
    pub(crate) timings: ActivityTimings,
    pub(crate) end_call_tool_name: String,
}

impl EventLoop {
    pub(crate) async fn run(self, mut inbound: InboundStream, mut states: ConnectionStateStream) {
        // Deadline of the pending return to `Listening`; one at a time, restarted by new activity.
        let mut listen_at: Option<Instant> = None;
        let mut inbound_open = true;
        let mut states_open = true;

        loop {
            let deadline = listen_at.unwrap_or_else(Instant::now);
            let flow = tokio::select! {
                frame = inbound.next(), if inbound_open => match frame {
                    Some(frame) => self.handle_frame(&frame, &mut listen_at).await,
                    None => {
                        tracing::debug!("inbound stream ended");
                        inbound_open = false;
                        ControlFlow::Continue(())
                    }
                },
                state = states.next(), if states_open => match state {
                    Some(state) => self.handle_connection_state(state),
                    None => {
                        states_open = false;
                        ControlFlow::Continue(())
                    }
                },
                _ = sleep_until(deadline), if listen_at.is_some() => {
                    listen_at = None;
                    self.set_activity(AgentActivity::Listening);
                    ControlFlow::Continue(())
                },
                else => ControlFlow::Break(()),
            };
            if flow.is_break() {
                break;
            }
        }
        tracing::debug!(agent_id = %self.agent_id, "event loop finished");
    }

    async fn handle_frame(&self, frame: &Bytes, listen_at: &mut Option<Instant>) -> ControlFlow<()> {
        self.with_stats(SessionStats::record_frame);

        let event = match parse_incoming(frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.with_stats(SessionStats::record_ignored);
                return ControlFlow::Continue(());
            }
            Err(e) => {
                tracing::warn!("dropping frame: {}", e);
                self.with_stats(SessionStats::record_malformed);
                return ControlFlow::Continue(());
            }
        };
        tracing::debug!("received event: {}", event.kind());

        match event {
            AgentEvent::ConversationMetadata { event } => {
                tracing::info!(conversation_id = event.conversation_id(), "conversation metadata");
                self.modify(|s| {
                    s.set_conversation_id(event.conversation_id());
                    s.set_activity(AgentActivity::Listening);
                });
                *listen_at = None;
            }
            AgentEvent::UserTranscript { event } => {
                self.modify(|s| {
                    s.push_message(Role::User, event.transcript());
                    s.set_activity(AgentActivity::Listening);
                });
                *listen_at = None;
            }
            AgentEvent::TentativeAgentResponse { .. } => {
                self.speaking(listen_at, self.timings.text_quiet);
            }
            AgentEvent::AgentResponse { event } => {
                self.modify(|s| s.record_agent_response(event.response()));
                self.speaking(listen_at, self.timings.text_quiet);
            }
            AgentEvent::AgentChatResponsePart { part } => {
                self.modify(|s| s.apply_part(&part));
            }
            AgentEvent::Audio { event } => {
                if self.handle_audio(&event) {
                    self.speaking(listen_at, self.timings.audio_quiet);
                }
            }
            AgentEvent::Interruption { event } => {
                tracing::debug!(event_id = event.event_id(), "agent interrupted");
                self.modify(|s| {
                    s.set_interrupted_event_id(event.event_id());
                    s.set_activity(AgentActivity::Listening);
                });
                *listen_at = None;
                self.with_playback(|playback| playback.interrupt());
            }
            AgentEvent::Ping { event } => {
                let pong = ClientEvent::Pong(PongEvent::new(event.event_id()));
                match self
                    .transport
                    .publish(Bytes::from(serialize_outgoing(&pong)), true)
                    .await
                {
                    Ok(()) => self.with_stats(SessionStats::record_pong),
                    Err(e) => tracing::error!(event_id = event.event_id(), "failed to answer ping: {}", e),
                }
            }
            AgentEvent::ClientToolCall { call } => {
                let call = ToolCall::from(call);
                let tool_call_id = call.tool_call_id().to_string();
                tracing::info!(tool_call_id = %tool_call_id, tool_name = call.tool_name(), "tool call requested");
                if let Some(Err(e)) = self.modify(|s| s.tool_calls_mut().register(call)) {
                    tracing::warn!(tool_call_id = %tool_call_id, "ignoring tool call: {}", e);
                }
            }
            AgentEvent::AgentToolResponse { response } => {
                if response.tool_name() == self.end_call_tool_name {
                    tracing::info!(tool_call_id = response.tool_call_id(), "agent ended the call");
                    return self.end_call().await;
                }
                tracing::debug!(tool_name = response.tool_name(), "agent tool response");
            }
        }
        ControlFlow::Continue(())
    }

    /// Forwards one chunk to playback; false when it was stale or undecodable.
    fn handle_audio(&self, event: &AudioEvent) -> bool {
        let stale = self
            .modify(|s| {
                let stale = s
                    .interrupted_event_id()
                    .is_some_and(|interrupted| event.event_id() < interrupted);
                if let (false, Some(alignment)) = (stale, event.alignment()) {
                    s.set_alignment(alignment.clone());
                }
                stale
            })
            .unwrap_or(true);
        if stale {
            tracing::trace!(event_id = event.event_id(), "dropping audio from interrupted response");
            return false;
        }

        let pcm = match decode_pcm16(event.audio_base_64()) {
            Ok(pcm) => pcm,
            Err(e) => {
                tracing::warn!(event_id = event.event_id(), "dropping undecodable audio: {}", e);
                self.with_stats(SessionStats::record_malformed);
                return false;
            }
        };
        self.with_playback(|playback| {
            playback.clear_if_interrupted()?;
            playback.enqueue(pcm)
        });
        self.with_stats(SessionStats::record_audio_chunk);
        true
    }

    fn handle_connection_state(&self, state: ConnectionState) -> ControlFlow<()> {
        tracing::debug!("connection state: {:?}", state);
        match state {
            ConnectionState::Connected | ConnectionState::Reconnecting => {
                let agent_id = self.agent_id.clone();
                self.modify(|s| {
                    if *s.state() == ConversationState::Connecting {
                        s.set_state(ConversationState::Active { agent_id });
                    }
                });
                ControlFlow::Continue(())
            }
            ConnectionState::Disconnected => {
                let live = self
                    .store
                    .read(|s| s.epoch() == self.epoch && matches!(s.state(), ConversationState::Active { .. } | ConversationState::Connecting));
                if live {
                    self.finish(EndReason::RemoteDisconnected);
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            ConnectionState::Connecting => ControlFlow::Continue(()),
        }
    }

    async fn end_call(&self) -> ControlFlow<()> {
        self.transport.disconnect().await;
        self.finish(EndReason::UserEnded);
        ControlFlow::Break(())
    }

    fn finish(&self, reason: EndReason) {
        let ended = self
            .store
            .modify_if_current(self.epoch, |s| s.finish_attempt(ConversationState::Ended(reason)));
        if ended.is_some() {
            self.with_playback(|playback| {
                playback.interrupt()?;
                playback.clear_if_interrupted()
            });
        }
    }

    fn speaking(&self, listen_at: &mut Option<Instant>, quiet: Duration) {
        self.set_activity(AgentActivity::Speaking);
        *listen_at = Some(Instant::now() + quiet);
    }

    fn set_activity(&self, activity: AgentActivity) {
        self.store.modify_if_current(self.epoch, |s| {
            if s.set_activity(activity) {
                tracing::trace!("agent activity: {:?}", activity);
            }
        });
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.store.modify_if_current(self.epoch, f)
    }

    fn with_stats(&self, f: impl FnOnce(&mut SessionStats)) {
        f(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn with_playback(&self, f: impl FnOnce(&mut PlaybackHandle) -> Result<(), PlaybackError>) {
        if let Some(playback) = &self.playback {
            let mut playback = playback.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = f(&mut playback) {
                tracing::warn!("playback control dropped: {}", e);
            }
        }
    }
}
