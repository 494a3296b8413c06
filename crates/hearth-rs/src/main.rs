//! Line-oriented terminal client for a Hearth conversation.

mod commands;
mod render;

use anyhow::{Context, bail};
use clap::Parser;
use commands::{Command, HELP, parse_command};
use hearth_rs_config::{HearthConfig, LayeredConfigOptions};
use hearth_rs_core::{
    ChangeFeedBus, ChatSession, EventBus, ReplyKind, RestChatStore, SessionError, SessionOptions,
    WebhookClient, notice,
};
use hearth_rs_protocol::{ChatMode, SessionEvent, SessionState};
use log::{debug, info, warn};
use render::{Transcript, format_message};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const GREETING: &str = "Hi, I'm here. How are you feeling today?";
const ACCESS_TOKEN_ENV: &str = "HEARTH_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "hearth", version)]
struct Cli {
    /// Extra config file layered over the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,
    /// Signed-in user id
    #[arg(long)]
    user: String,
    /// Thread label override
    #[arg(long)]
    thread_label: Option<String>,
    /// Start in test mode
    #[arg(long)]
    test_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting hearth (config_set={}, thread_label_set={}, test_mode={})",
        cli.config.is_some(),
        cli.thread_label.is_some(),
        cli.test_mode
    );
    let mut config = load_config(cli.config.as_ref())?;
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        debug!("using access token from {}", ACCESS_TOKEN_ENV);
        config.backend.access_token = Some(token);
    }
    if config.webhook.url.is_none() {
        bail!("webhook.url must be configured in hearth.json5");
    }

    let store =
        RestChatStore::from_config(&config.backend).context("failed to build store client")?;
    let generator =
        WebhookClient::from_config(&config.webhook).context("failed to build webhook client")?;
    let feed = ChangeFeedBus::new(config.session.event_buffer);
    let events = EventBus::new(config.session.event_buffer);

    let mut options = SessionOptions::from_config(&config);
    if let Some(label) = cli.thread_label {
        options.thread_label = label;
    }
    if cli.test_mode {
        options.mode = ChatMode::Test;
    }
    let session = ChatSession::new(
        Arc::new(store),
        Arc::new(feed),
        Arc::new(generator),
        Arc::new(events.clone()),
        options,
    );
    let printer = tokio::spawn(print_events(events.subscribe()));

    let state = session
        .sign_in(cli.user)
        .await
        .context("failed to start session")?;
    if state == SessionState::Ready && session.is_empty() {
        session.inject_assistant(GREETING)?;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Say(text) => match session.send(&text).await {
                Ok(outcome) => {
                    if let ReplyKind::Failed(kind) = outcome.kind {
                        debug!("reply replaced by notice (kind={:?})", kind);
                    }
                }
                Err(err) => print_session_error(&err),
            },
            Command::Silent(text) => match session.send_silent(&text).await {
                Ok(outcome) => println!("(silent) {}", outcome.reply.content),
                Err(err) => print_session_error(&err),
            },
            Command::Mode(mode) => {
                if session.set_mode(mode) {
                    println!("mode: {}", mode.as_str());
                } else {
                    println!("already in {} mode", mode.as_str());
                }
            }
            Command::Retry => match session.retry_thread().await {
                Ok(thread_id) => println!("conversation ready ({thread_id})"),
                Err(err) => print_session_error(&err),
            },
            Command::History => {
                for message in session.messages() {
                    println!("{}", format_message(&message));
                }
            }
        }
    }

    info!("shutting down (session_id={})", session.session_id());
    session.settle().await;
    session.sign_out();
    printer.abort();
    Ok(())
}

fn load_config(runtime_path: Option<&PathBuf>) -> anyhow::Result<HearthConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = runtime_path {
        info!("adding runtime config layer: {}", path.display());
        options = options.with_runtime_path(path);
    }
    let layered = HearthConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}

fn print_session_error(err: &SessionError) {
    match err {
        // The notice itself is printed from the state event.
        SessionError::ThreadUnavailable(_) => {
            println!("type /retry to look for your conversation again");
        }
        SessionError::Busy | SessionError::EmptyMessage | SessionError::SignedOut => {
            println!("({err})");
        }
    }
}

async fn print_events(mut receiver: broadcast::Receiver<SessionEvent>) {
    let mut transcript = Transcript::default();
    loop {
        match receiver.recv().await {
            Ok(SessionEvent::MessagesChanged { messages, .. }) => {
                for line in transcript.fresh(&messages) {
                    println!("{line}");
                }
            }
            Ok(SessionEvent::StateChanged {
                state: SessionState::ThreadUnavailable(reason),
                ..
            }) => {
                println!("{}", notice::thread_unavailable(&reason));
            }
            Ok(SessionEvent::StateChanged { .. } | SessionEvent::ModeChanged { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event printer lagged (skipped={})", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
