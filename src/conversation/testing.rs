//! In-crate fakes for the transport and credential collaborators.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::{mpsc, Notify};

use crate::error::{ConnectionError, PublishError, TokenError};
use crate::transport::{
    ConnectionDetails, ConnectionState, ConnectionStateStream, InboundStream, TokenOverrides,
    TokenProvider, Transport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgentReady {
    Immediate,
    Never,
    /// Ready once [`FakeTransport::release_agent`] is called.
    Gated,
}

struct FakeState {
    inbound_tx: Option<mpsc::UnboundedSender<Bytes>>,
    inbound_rx: Option<mpsc::UnboundedReceiver<Bytes>>,
    states_tx: Option<mpsc::UnboundedSender<ConnectionState>>,
    states_rx: Option<mpsc::UnboundedReceiver<ConnectionState>>,
    published: Vec<Bytes>,
    connect_calls: Vec<(String, bool)>,
    disconnects: usize,
    agent_ready: AgentReady,
    connect_error: Option<String>,
    publish_error: Option<String>,
    microphone_error: Option<String>,
    microphone: bool,
    stall_disconnect: bool,
}

/// Records everything the session sends and lets tests inject frames and
/// connection-state changes. Each `connect` opens fresh channels.
pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
    agent_gate: Arc<Notify>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                inbound_tx: None,
                inbound_rx: None,
                states_tx: None,
                states_rx: None,
                published: Vec::new(),
                connect_calls: Vec::new(),
                disconnects: 0,
                agent_ready: AgentReady::Immediate,
                connect_error: None,
                publish_error: None,
                microphone_error: None,
                microphone: false,
                stall_disconnect: false,
            }),
            agent_gate: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_agent_ready(&self, mode: AgentReady) {
        self.lock().agent_ready = mode;
    }

    pub(crate) fn release_agent(&self) {
        self.agent_gate.notify_one();
    }

    /// Makes every later `disconnect` hang after recording the call.
    pub(crate) fn stall_disconnect(&self) {
        self.lock().stall_disconnect = true;
    }

    pub(crate) fn fail_connect(&self, cause: &str) {
        self.lock().connect_error = Some(cause.to_string());
    }

    pub(crate) fn fail_publish(&self, cause: Option<&str>) {
        self.lock().publish_error = cause.map(str::to_string);
    }

    pub(crate) fn fail_microphone(&self, cause: &str) {
        self.lock().microphone_error = Some(cause.to_string());
    }

    /// Delivers one inbound frame, as the agent would.
    pub(crate) fn push_frame(&self, frame: serde_json::Value) {
        self.push_raw(frame.to_string().as_bytes());
    }

    pub(crate) fn push_raw(&self, frame: &[u8]) {
        if let Some(tx) = self.lock().inbound_tx.as_ref() {
            let _ = tx.send(Bytes::copy_from_slice(frame));
        }
    }

    pub(crate) fn push_state(&self, state: ConnectionState) {
        if let Some(tx) = self.lock().states_tx.as_ref() {
            let _ = tx.send(state);
        }
    }

    pub(crate) fn published(&self) -> Vec<Bytes> {
        self.lock().published.clone()
    }

    pub(crate) fn published_json(&self) -> Vec<serde_json::Value> {
        self.published()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    /// Published events of one `type`, in order.
    pub(crate) fn published_of(&self, kind: &str) -> Vec<serde_json::Value> {
        self.published_json()
            .into_iter()
            .filter(|event| event["type"] == kind)
            .collect()
    }

    pub(crate) fn connect_calls(&self) -> Vec<(String, bool)> {
        self.lock().connect_calls.clone()
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.lock().disconnects
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, details: &ConnectionDetails, enable_microphone: bool) -> Result<(), ConnectionError> {
        let mut state = self.lock();
        state
            .connect_calls
            .push((details.server_url().to_string(), enable_microphone));
        if let Some(cause) = state.connect_error.clone() {
            return Err(ConnectionError::Failed(cause));
        }
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (states_tx, states_rx) = mpsc::unbounded_channel();
        state.inbound_tx = Some(inbound_tx);
        state.inbound_rx = Some(inbound_rx);
        state.states_tx = Some(states_tx);
        state.states_rx = Some(states_rx);
        state.microphone = enable_microphone;
        Ok(())
    }

    async fn disconnect(&self) {
        let stall = {
            let mut state = self.lock();
            state.disconnects += 1;
            state.inbound_tx = None;
            state.states_tx = None;
            state.microphone = false;
            state.stall_disconnect
        };
        if stall {
            futures::future::pending::<()>().await;
        }
    }

    fn inbound(&self) -> InboundStream {
        match self.lock().inbound_rx.take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|payload| (payload, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    fn connection_states(&self) -> ConnectionStateStream {
        match self.lock().states_rx.take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|state| (state, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    async fn publish(&self, payload: Bytes, _reliable: bool) -> Result<(), PublishError> {
        let mut state = self.lock();
        if let Some(cause) = state.publish_error.clone() {
            return Err(PublishError(cause));
        }
        state.published.push(payload);
        Ok(())
    }

    async fn wait_for_agent_ready(&self) {
        let mode = self.lock().agent_ready;
        match mode {
            AgentReady::Immediate => {}
            AgentReady::Never => futures::future::pending::<()>().await,
            AgentReady::Gated => self.agent_gate.notified().await,
        }
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), ConnectionError> {
        let mut state = self.lock();
        if let Some(cause) = state.microphone_error.clone() {
            return Err(ConnectionError::Failed(cause));
        }
        state.microphone = enabled;
        Ok(())
    }

    fn is_microphone_enabled(&self) -> bool {
        self.lock().microphone
    }
}

/// A credential endpoint that never answers.
pub(crate) struct PendingTokenProvider;

#[async_trait]
impl TokenProvider for PendingTokenProvider {
    async fn fetch_connection_details(
        &self,
        _agent_id: &str,
        _overrides: &TokenOverrides,
    ) -> Result<ConnectionDetails, TokenError> {
        futures::future::pending().await
    }
}
