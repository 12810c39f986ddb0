use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::codec::serialize_outgoing;
use crate::error::{ConversationError, ToolCallError};
use crate::transport::{TokenProvider, Transport};
use crate::types::audio::Alignment;
use crate::types::events::client::{
    ContextualUpdateEvent, FeedbackEvent, FeedbackScore, UserMessageEvent,
};
use crate::types::ClientEvent;
use crate::utils::playback::PlaybackHandle;

use event_loop::EventLoop;
use model::SessionStore;

pub mod config;
mod event_loop;
pub mod model;
pub mod startup;
pub mod stats;
pub mod streaming;
#[cfg(test)]
pub(crate) mod testing;
pub mod tools;

pub use config::{ActivityTimings, ConversationOptions, SessionConfig, SessionConfigBuilder, StartupTimeouts};
pub use model::{AgentActivity, ConversationState, EndReason, Message, Role, Session};
pub use startup::{StartupMetrics, StartupOrchestrator, StartupState};
pub use stats::SessionStats;
pub use tools::{ToolCall, ToolCallRegistry};

/// Collaborators a [`Conversation`] is built from.
pub struct Dependencies {
    transport: Arc<dyn Transport>,
    token_provider: Arc<dyn TokenProvider>,
    playback: Option<PlaybackHandle>,
    config: SessionConfig,
}

impl Dependencies {
    pub fn new(transport: Arc<dyn Transport>, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            transport,
            token_provider,
            playback: None,
            config: SessionConfig::default(),
        }
    }

    /// Routes agent audio to the producer side of a playback channel.
    pub fn with_playback(mut self, playback: PlaybackHandle) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    token_provider: Arc<dyn TokenProvider>,
    config: SessionConfig,
    store: SessionStore,
    playback: Option<Arc<Mutex<PlaybackHandle>>>,
    stats: Arc<Mutex<SessionStats>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.event_loop).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A conversational session with a remote agent.
///
/// Cheap to clone; clones share the same session. Observers either poll the
/// accessors or [`subscribe`](Self::subscribe) to snapshots.
#[derive(Clone)]
pub struct Conversation {
    inner: Arc<Inner>,
}

impl Conversation {
    pub fn new(deps: Dependencies) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport: deps.transport,
                token_provider: deps.token_provider,
                config: deps.config,
                store: SessionStore::new(),
                playback: deps.playback.map(|p| Arc::new(Mutex::new(p))),
                stats: Arc::new(Mutex::new(SessionStats::new())),
                event_loop: Mutex::new(None),
            }),
        }
    }

    /// Connects to `agent_id` and negotiates the conversation.
    ///
    /// The state is `Connecting` as soon as the returned future is first
    /// polled, so a concurrent second call fails with `AlreadyActive`.
    pub async fn start_session(
        &self,
        agent_id: &str,
        options: ConversationOptions,
    ) -> Result<StartupMetrics, ConversationError> {
        let inner = &self.inner;
        let epoch = inner.store.modify(|s| {
            if s.state().can_start() {
                Ok(s.begin_attempt())
            } else {
                Err(ConversationError::AlreadyActive)
            }
        })?;
        tracing::info!(agent_id, "starting conversation");

        let mut guard = AttemptGuard {
            conversation: self,
            epoch,
            armed: true,
        };

        self.stop_event_loop().await;
        self.stop_playback();

        let mut event_loop = Some(EventLoop {
            store: inner.store.clone(),
            epoch,
            agent_id: agent_id.to_string(),
            transport: inner.transport.clone(),
            playback: inner.playback.clone(),
            stats: inner.stats.clone(),
            timings: *inner.config.activity(),
            end_call_tool_name: inner.config.end_call_tool_name().to_string(),
        });

        let orchestrator = StartupOrchestrator::new(
            inner.transport.as_ref(),
            inner.token_provider.as_ref(),
            *inner.config.timeouts(),
        );
        let result = orchestrator
            .run(agent_id, &options, |state| {
                inner
                    .store
                    .modify_if_current(epoch, |s| s.set_startup_state(Some(state)));
                // Frames are consumed from here on so pings are answered while the agent joins.
                if state == StartupState::AwaitingAgent {
                    if let Some(event_loop) = event_loop.take() {
                        let handle = tokio::spawn(
                            event_loop.run(inner.transport.inbound(), inner.transport.connection_states()),
                        );
                        *lock(&inner.event_loop) = Some(handle);
                    }
                }
            })
            .await;

        match result {
            Ok(metrics) => {
                guard.armed = false;
                let agent_id = agent_id.to_string();
                let activated = inner.store.modify_if_current(epoch, |s| {
                    s.set_startup_state(None);
                    if *s.state() == ConversationState::Connecting {
                        s.set_state(ConversationState::Active { agent_id });
                    }
                    s.state().is_active()
                });
                if activated != Some(true) {
                    // The event loop already recorded how the session ended.
                    tracing::warn!("conversation ended during startup");
                    return Err(ConversationError::ConnectionFailed(
                        "disconnected during startup".to_string(),
                    ));
                }
                Ok(metrics)
            }
            Err(err) => {
                tracing::error!("failed to start conversation: {}", err);
                // Must land before the awaits below; the caller may drop us there.
                inner
                    .store
                    .modify_if_current(epoch, |s| s.finish_attempt(ConversationState::Error(err.clone())));
                guard.armed = false;
                self.stop_event_loop().await;
                inner.transport.disconnect().await;
                Err(err)
            }
        }
    }

    /// Hangs up. Only valid while active.
    pub async fn end_session(&self) -> Result<(), ConversationError> {
        let epoch = self.require_active()?;
        self.inner.store.modify_if_current(epoch, |s| {
            s.finish_attempt(ConversationState::Ended(EndReason::UserEnded))
        });
        self.stop_playback();
        self.stop_event_loop().await;
        self.inner.transport.disconnect().await;
        tracing::info!("conversation ended by user");
        Ok(())
    }

    /// Sends a typed user message and appends it to the transcript.
    pub async fn send_message(&self, text: &str) -> Result<(), ConversationError> {
        let epoch = self.require_active()?;
        self.publish(ClientEvent::UserMessage(UserMessageEvent::new(text)))
            .await?;
        self.inner
            .store
            .modify_if_current(epoch, |s| s.push_message(Role::User, text));
        Ok(())
    }

    /// Gives the agent background information without prompting a reply.
    pub async fn update_context(&self, text: &str) -> Result<(), ConversationError> {
        self.require_active()?;
        self.publish(ClientEvent::ContextualUpdate(ContextualUpdateEvent::new(text)))
            .await
    }

    pub async fn send_feedback(&self, score: FeedbackScore, event_id: u64) -> Result<(), ConversationError> {
        self.require_active()?;
        self.publish(ClientEvent::Feedback(FeedbackEvent::new(score, event_id)))
            .await
    }

    /// Answers a pending tool call. The call leaves the registry only once the
    /// result has been published.
    pub async fn send_tool_result(
        &self,
        tool_call_id: &str,
        result: impl Into<serde_json::Value>,
        is_error: bool,
    ) -> Result<(), ConversationError> {
        let epoch = self.require_active()?;
        let result = result.into();
        let (index, call, event) = self
            .inner
            .store
            .modify_if_current(epoch, |s| {
                let index = s.pending_tool_calls().position(tool_call_id);
                s.tool_calls_mut()
                    .resolve(tool_call_id, result, is_error)
                    .map(|(call, event)| (index.unwrap_or_default(), call, event))
            })
            .ok_or(ConversationError::NotConnected)?
            .map_err(|e| match e {
                ToolCallError::Unknown(id) | ToolCallError::Duplicate(id) => {
                    ConversationError::UnknownToolCall(id)
                }
            })?;

        if let Err(err) = self.publish(ClientEvent::ClientToolResult(event)).await {
            self.inner
                .store
                .modify_if_current(epoch, |s| s.tool_calls_mut().restore(index, call));
            return Err(err);
        }
        tracing::debug!(tool_call_id, is_error, "tool result sent");
        Ok(())
    }

    /// Flips the microphone; returns the new mute state.
    pub async fn toggle_mute(&self) -> Result<bool, ConversationError> {
        let muted = !self.is_muted();
        self.set_muted(muted).await?;
        Ok(muted)
    }

    /// Mutes or unmutes the microphone. On failure the mute state is unchanged.
    pub async fn set_muted(&self, muted: bool) -> Result<(), ConversationError> {
        let epoch = self.require_active()?;
        self.inner
            .transport
            .set_microphone_enabled(!muted)
            .await
            .map_err(|e| ConversationError::MicrophoneToggleFailed(e.to_string()))?;
        self.inner
            .store
            .modify_if_current(epoch, |s| s.set_muted(muted));
        Ok(())
    }

    /// Cuts the agent off: signals user activity, drops queued playback and
    /// returns to listening.
    pub async fn interrupt_agent(&self) -> Result<(), ConversationError> {
        let epoch = self.require_active()?;
        self.publish(ClientEvent::UserActivity).await?;
        self.stop_playback();
        self.inner
            .store
            .modify_if_current(epoch, |s| s.set_activity(AgentActivity::Listening));
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.store.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.store.read(Session::clone)
    }

    pub fn state(&self) -> ConversationState {
        self.inner.store.read(|s| s.state().clone())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.store.read(|s| s.messages().to_vec())
    }

    pub fn agent_activity(&self) -> AgentActivity {
        self.inner.store.read(Session::agent_activity)
    }

    pub fn is_muted(&self) -> bool {
        self.inner.store.read(Session::is_muted)
    }

    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        self.inner
            .store
            .read(|s| s.pending_tool_calls().iter().cloned().collect())
    }

    pub fn latest_audio_alignment(&self) -> Option<Alignment> {
        self.inner
            .store
            .read(|s| s.latest_audio_alignment().cloned())
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.inner
            .store
            .read(|s| s.conversation_id().map(str::to_string))
    }

    pub fn stats(&self) -> SessionStats {
        lock(&self.inner.stats).clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn require_active(&self) -> Result<u64, ConversationError> {
        self.inner.store.read(|s| {
            if s.state().is_active() {
                Ok(s.epoch())
            } else {
                Err(ConversationError::NotConnected)
            }
        })
    }

    async fn publish(&self, event: ClientEvent) -> Result<(), ConversationError> {
        let payload = Bytes::from(serialize_outgoing(&event));
        self.inner.transport.publish(payload, true).await.map_err(|e| {
            tracing::error!("failed to publish {}: {}", event.kind(), e);
            ConversationError::Publish(e)
        })
    }

    async fn stop_event_loop(&self) {
        let handle = lock(&self.inner.event_loop).take();
        if let Some(handle) = handle {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("event loop failed: {}", e);
                }
            }
        }
    }

    fn stop_playback(&self) {
        if let Some(playback) = &self.inner.playback {
            let mut playback = lock(playback);
            if let Err(e) = playback.interrupt().and_then(|()| playback.clear_if_interrupted()) {
                tracing::warn!("failed to stop playback: {}", e);
            }
        }
    }
}

/// Fails the attempt if `start_session` is dropped before startup finished.
struct AttemptGuard<'a> {
    conversation: &'a Conversation,
    epoch: u64,
    armed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let inner = &self.conversation.inner;
        if let Some(handle) = lock(&inner.event_loop).take() {
            handle.abort();
        }
        let cancelled = inner.store.modify_if_current(self.epoch, |s| {
            s.finish_attempt(ConversationState::Error(ConversationError::ConnectionFailed(
                "startup cancelled".to_string(),
            )))
        });
        if cancelled.is_some() {
            tracing::warn!("conversation startup cancelled");
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let transport = inner.transport.clone();
                runtime.spawn(async move { transport.disconnect().await });
            }
        }
    }
}
