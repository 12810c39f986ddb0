use std::sync::Arc;

use clap::Parser;
use convai_session::conversation::{AgentActivity, Role};
use convai_session::types::ConversationInitiation;
use convai_session::{
    Conversation, ConversationOptions, ConversationState, Dependencies, PublicAgentTokenProvider,
    SessionConfig, WebSocketTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Text chat with a public conversational agent.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Agent to talk to
    #[arg(long, env = "CONVAI_AGENT_ID")]
    agent_id: String,

    /// Overrides the agent's first message
    #[arg(long)]
    first_message: Option<String>,

    /// Language code, ex: "en"
    #[arg(long)]
    language: Option<String>,

    /// WebSocket endpoint of the conversation service
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Args::parse();
    let config = SessionConfig::from_env()?;

    let token_provider = match &args.base_url {
        Some(base_url) => PublicAgentTokenProvider::new(base_url),
        None => PublicAgentTokenProvider::default(),
    };
    let transport = WebSocketTransport::new(config.channel_capacity());
    let conversation = Conversation::new(
        Dependencies::new(Arc::new(transport), Arc::new(token_provider)).with_config(config),
    );

    let mut initiation = ConversationInitiation::new().with_text_only(true);
    if let Some(first_message) = &args.first_message {
        initiation = initiation.with_first_message(first_message);
    }
    if let Some(language) = &args.language {
        initiation = initiation.with_language(language);
    }
    let options = ConversationOptions::from(initiation);

    let metrics = conversation.start_session(&args.agent_id, options).await?;
    println!("connected in {:?}, type a message (empty line quits)", metrics.total);

    let mut updates = conversation.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut activity = AgentActivity::Listening;
        while updates.changed().await.is_ok() {
            let session = updates.borrow_and_update().clone();
            for message in session.messages().iter().skip(printed) {
                if message.is_open() {
                    break;
                }
                if message.role() == Role::Agent {
                    println!("agent> {}", message.content());
                }
                printed += 1;
            }
            if session.agent_activity() != activity {
                activity = session.agent_activity();
                tracing::debug!("agent is {:?}", activity);
            }
            if let ConversationState::Ended(reason) = session.state() {
                println!("conversation ended: {:?}", reason);
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Err(e) = conversation.send_message(line).await {
            eprintln!("failed to send message: {}", e);
            break;
        }
    }

    if conversation.state().is_active() {
        conversation.end_session().await?;
    }
    printer.abort();

    let stats = conversation.stats();
    println!(
        "frames: {} received, {} malformed, {} pings answered",
        stats.frames_received(),
        stats.frames_malformed(),
        stats.pings_answered()
    );
    Ok(())
}
