use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::codec::serialize_outgoing;
use crate::conversation::config::{ConversationOptions, StartupTimeouts};
use crate::error::ConversationError;
use crate::transport::{TokenProvider, Transport};
use crate::types::ClientEvent;

/// Checkpoints reported before each startup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    ResolvingToken,
    ConnectingRoom,
    AwaitingAgent,
}

/// How long each startup step took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupMetrics {
    pub token: Duration,
    pub connect: Duration,
    pub init: Duration,
    pub agent_ready: Duration,
    pub total: Duration,
}

/// Drives token → connect → conversation-init → agent-ready.
///
/// Nothing is retried. On failure the transport may be left partially
/// connected; disconnecting it is up to the caller.
pub struct StartupOrchestrator<'a> {
    transport: &'a dyn Transport,
    token_provider: &'a dyn TokenProvider,
    timeouts: StartupTimeouts,
}

impl<'a> StartupOrchestrator<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        token_provider: &'a dyn TokenProvider,
        timeouts: StartupTimeouts,
    ) -> Self {
        Self {
            transport,
            token_provider,
            timeouts,
        }
    }

    pub async fn run(
        &self,
        agent_id: &str,
        options: &ConversationOptions,
        mut on_state: impl FnMut(StartupState) + Send,
    ) -> Result<StartupMetrics, ConversationError> {
        let mut metrics = StartupMetrics::default();
        let started = Instant::now();

        on_state(StartupState::ResolvingToken);
        let step = Instant::now();
        let details = with_timeout(
            "token",
            self.timeouts.token,
            self.token_provider
                .fetch_connection_details(agent_id, options.token_overrides()),
        )
        .await?
        .map_err(ConversationError::from)?;
        metrics.token = step.elapsed();

        on_state(StartupState::ConnectingRoom);
        let step = Instant::now();
        with_timeout(
            "connect",
            self.timeouts.connect,
            self.transport.connect(&details, options.microphone_enabled()),
        )
        .await?
        .map_err(ConversationError::from)?;
        metrics.connect = step.elapsed();

        let step = Instant::now();
        let init = ClientEvent::ConversationInitiation(options.initiation().clone());
        self.transport
            .publish(Bytes::from(serialize_outgoing(&init)), true)
            .await
            .map_err(|e| ConversationError::ConnectionFailed(e.to_string()))?;
        metrics.init = step.elapsed();

        on_state(StartupState::AwaitingAgent);
        let step = Instant::now();
        if tokio::time::timeout(self.timeouts.agent_ready, self.transport.wait_for_agent_ready())
            .await
            .is_err()
        {
            tracing::warn!(agent_id, "agent did not join within {:?}", self.timeouts.agent_ready);
            return Err(ConversationError::AgentTimeout);
        }
        metrics.agent_ready = step.elapsed();
        metrics.total = started.elapsed();

        tracing::info!(
            agent_id,
            token_ms = metrics.token.as_millis() as u64,
            connect_ms = metrics.connect.as_millis() as u64,
            init_ms = metrics.init.as_millis() as u64,
            agent_ready_ms = metrics.agent_ready.as_millis() as u64,
            total_ms = metrics.total.as_millis() as u64,
            "conversation started"
        );
        Ok(metrics)
    }
}

async fn with_timeout<F: Future>(step: &str, limit: Duration, fut: F) -> Result<F::Output, ConversationError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ConversationError::ConnectionFailed(format!("{step} timed out after {limit:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::{AgentReady, FakeTransport, PendingTokenProvider};
    use crate::error::TokenError;
    use crate::transport::{ConnectionDetails, MockTokenProvider};
    use crate::types::ConversationInitiation;

    fn token_ok() -> MockTokenProvider {
        let mut provider = MockTokenProvider::new();
        provider
            .expect_fetch_connection_details()
            .times(1)
            .returning(|_, _| Ok(ConnectionDetails::new("wss://fake.test")));
        provider
    }

    #[tokio::test]
    async fn steps_run_in_order_and_send_init() {
        let transport = FakeTransport::new();
        let provider = token_ok();
        let orchestrator = StartupOrchestrator::new(&transport, &provider, StartupTimeouts::default());
        let options: ConversationOptions = ConversationInitiation::new().with_first_message("Hi").into();

        let mut seen = Vec::new();
        orchestrator
            .run("agent", &options, |state| seen.push(state))
            .await
            .unwrap();

        assert_eq!(
            seen,
            [
                StartupState::ResolvingToken,
                StartupState::ConnectingRoom,
                StartupState::AwaitingAgent
            ]
        );
        assert_eq!(transport.connect_calls(), vec![("wss://fake.test".to_string(), true)]);
        let published = transport.published_json();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["type"], "conversation_initiation_client_data");
    }

    #[tokio::test]
    async fn authentication_failure_is_reported_as_such() {
        let transport = FakeTransport::new();
        let mut provider = MockTokenProvider::new();
        provider
            .expect_fetch_connection_details()
            .returning(|_, _| Err(TokenError::AuthenticationFailed("bad key".to_string())));
        let orchestrator = StartupOrchestrator::new(&transport, &provider, StartupTimeouts::default());

        let err = orchestrator
            .run("agent", &ConversationOptions::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, ConversationError::AuthenticationFailed("bad key".to_string()));
        assert!(transport.connect_calls().is_empty());
    }

    #[tokio::test]
    async fn other_token_errors_are_connection_failures() {
        let transport = FakeTransport::new();
        let mut provider = MockTokenProvider::new();
        provider
            .expect_fetch_connection_details()
            .returning(|_, _| Err(TokenError::HttpError(503)));
        let orchestrator = StartupOrchestrator::new(&transport, &provider, StartupTimeouts::default());

        let err = orchestrator
            .run("agent", &ConversationOptions::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn connect_failure_stops_before_init() {
        let transport = FakeTransport::new();
        transport.fail_connect("room full");
        let provider = token_ok();
        let orchestrator = StartupOrchestrator::new(&transport, &provider, StartupTimeouts::default());

        let mut seen = Vec::new();
        let err = orchestrator
            .run("agent", &ConversationOptions::new(), |state| seen.push(state))
            .await
            .unwrap_err();
        assert_eq!(err, ConversationError::ConnectionFailed("room full".to_string()));
        assert_eq!(seen.last(), Some(&StartupState::ConnectingRoom));
        assert!(transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn agent_that_never_joins_times_out() {
        let transport = FakeTransport::new();
        transport.set_agent_ready(AgentReady::Never);
        let provider = token_ok();
        let timeouts = StartupTimeouts {
            agent_ready: Duration::from_secs(3),
            ..StartupTimeouts::default()
        };
        let orchestrator = StartupOrchestrator::new(&transport, &provider, timeouts);

        let started = Instant::now();
        let err = orchestrator
            .run("agent", &ConversationOptions::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, ConversationError::AgentTimeout);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_token_fetch_times_out() {
        let transport = FakeTransport::new();
        let provider = PendingTokenProvider;
        let timeouts = StartupTimeouts {
            token: Duration::from_secs(10),
            ..StartupTimeouts::default()
        };
        let orchestrator = StartupOrchestrator::new(&transport, &provider, timeouts);

        let err = orchestrator
            .run("agent", &ConversationOptions::new(), |_| {})
            .await
            .unwrap_err();
        match err {
            ConversationError::ConnectionFailed(cause) => assert!(cause.starts_with("token timed out")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(transport.connect_calls().is_empty());
    }
}
