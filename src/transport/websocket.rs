use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt as _;
use futures_util::SinkExt;
use secrecy::ExposeSecret;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;

use crate::consts::{AUTHORIZATION_HEADER, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{ConnectionError, PublishError};
use crate::transport::{
    ConnectionDetails, ConnectionState, ConnectionStateStream, InboundStream, Transport,
};

struct Connection {
    outbound: mpsc::Sender<Bytes>,
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

/// [`Transport`] over a plain WebSocket: every text frame is one data-channel
/// payload and the agent counts as ready once its first frame arrives.
///
/// There is no media track, so the microphone flag is bookkeeping only.
pub struct WebSocketTransport {
    capacity: usize,
    connection: Mutex<Option<Connection>>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    states: Mutex<Option<mpsc::UnboundedReceiver<ConnectionState>>>,
    agent_ready: watch::Sender<bool>,
    microphone: AtomicBool,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl WebSocketTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            connection: Mutex::new(None),
            inbound: Mutex::new(None),
            states: Mutex::new(None),
            agent_ready: watch::Sender::new(false),
            microphone: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.connection)
            .as_ref()
            .is_some_and(|c| !c.recv_handle.is_finished())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_request(details: &ConnectionDetails) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request = details.server_url().into_client_request()?;
    if let Some(token) = details.token() {
        request.headers_mut().insert(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", token.expose_secret()).as_str().parse()?,
        );
    }
    Ok(request)
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, details: &ConnectionDetails, enable_microphone: bool) -> Result<(), ConnectionError> {
        if self.is_connected() {
            return Err(ConnectionError::Failed("already connected".to_string()));
        }

        let request = build_request(details).map_err(|e| ConnectionError::Failed(e.to_string()))?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ConnectionError::Failed(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = mpsc::channel::<Bytes>(self.capacity);
        let (s_tx, s_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = mpsc::unbounded_channel();

        self.agent_ready.send_replace(false);
        self.microphone.store(enable_microphone, Ordering::SeqCst);
        *lock(&self.inbound) = Some(s_rx);
        *lock(&self.states) = Some(state_rx);
        let _ = state_tx.send(ConnectionState::Connected);

        let send_handle = tokio::spawn(async move {
            while let Some(payload) = c_rx.recv().await {
                let text = match String::from_utf8(payload.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("failed to encode payload as text: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::error!("failed to send message: {}", e);
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("failed to close socket: {}", e);
            }
        });

        let agent_ready = self.agent_ready.clone();
        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        agent_ready.send_replace(true);
                        if s_tx.send(Bytes::from(text.into_bytes())).is_err() {
                            tracing::trace!("inbound receiver dropped");
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            let _ = state_tx.send(ConnectionState::Disconnected);
        });

        *lock(&self.connection) = Some(Connection {
            outbound: c_tx,
            send_handle,
            recv_handle,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            // Closing the outbound channel lets the send task flush and close the socket.
            drop(connection.outbound);
            connection.recv_handle.abort();
            if let Err(e) = connection.send_handle.await {
                tracing::debug!("send task ended abnormally: {}", e);
            }
        }
        self.microphone.store(false, Ordering::SeqCst);
    }

    fn inbound(&self) -> InboundStream {
        match lock(&self.inbound).take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|payload| (payload, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    fn connection_states(&self) -> ConnectionStateStream {
        match lock(&self.states).take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|state| (state, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    async fn publish(&self, payload: Bytes, reliable: bool) -> Result<(), PublishError> {
        let outbound = lock(&self.connection)
            .as_ref()
            .map(|c| c.outbound.clone())
            .ok_or_else(|| PublishError("not connected".to_string()))?;
        if !reliable {
            tracing::trace!("websocket delivery is always reliable");
        }
        outbound
            .send(payload)
            .await
            .map_err(|_| PublishError("connection closed".to_string()))
    }

    async fn wait_for_agent_ready(&self) {
        let mut ready = self.agent_ready.subscribe();
        // The sender lives in `self`, so the wait only ends once a frame arrives.
        let _ = ready.wait_for(|ready| *ready).await;
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), ConnectionError> {
        if lock(&self.connection).is_none() {
            return Err(ConnectionError::NotConnected);
        }
        self.microphone.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_microphone_enabled(&self) -> bool {
        self.microphone.load(Ordering::SeqCst)
    }
}
