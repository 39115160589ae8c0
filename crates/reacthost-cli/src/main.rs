//! reacthost - console demo host
//!
//! Reads commands from stdin and plays the part of the chat platform:
//!
//! ```text
//! start alice              # alice opens a tic-tac-toe lobby in #general
//! react bob 1 +            # bob joins (➕ on msg-1)
//! react alice 1 5          # alice takes the centre (5⃣)
//! apps                     # list running instances
//! quit                     # stop, save and exit (also Ctrl-C / EOF)
//! ```
//!
//! Running apps are saved on exit and restored on the next start.

mod console_chat;
mod tictactoe;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use reacthost_core::domain::{ChannelId, GuildId, Member, MessageId, ReactionAdd, UserId};
use reacthost_core::user_finder::{JOIN_EMOJI, LEAVE_EMOJI};
use reacthost_core::{Engine, EngineBuilder, HostConfig, HostedApp};

use crate::console_chat::ConsoleChat;
use crate::tictactoe::{Game, KEYCAPS};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_CONFIG_PATH: &str = "reacthost.json";
const DEFAULT_CHANNEL: &str = "general";
const GUILD: &str = "console";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start {
        user: String,
        channel: String,
    },
    React {
        user: String,
        message: String,
        emoji: String,
        channel: String,
    },
    Apps,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let channel = |i: usize| words.get(i).unwrap_or(&DEFAULT_CHANNEL).to_string();

        let command = match words.as_slice() {
            [] => return Ok(None),
            ["start", user, ..] if words.len() <= 3 => Command::Start {
                user: user.to_string(),
                channel: channel(2),
            },
            ["react", user, message, emoji, ..] if words.len() <= 5 => Command::React {
                user: user.to_string(),
                message: message_id(message),
                emoji: expand_emoji(emoji),
                channel: channel(4),
            },
            ["apps"] => Command::Apps,
            ["help"] => Command::Help,
            ["quit" | "exit"] => Command::Quit,
            _ => return Err(format!("unknown command: {line} (try `help`)")),
        };
        Ok(Some(command))
    }
}

/// `3` is shorthand for `msg-3`.
fn message_id(raw: &str) -> String {
    if raw.chars().all(|c| c.is_ascii_digit()) {
        format!("msg-{raw}")
    } else {
        raw.to_string()
    }
}

/// `1`..`9` are keycaps, `+`/`-` join and leave.
fn expand_emoji(raw: &str) -> String {
    match raw {
        "+" => JOIN_EMOJI.to_string(),
        "-" => LEAVE_EMOJI.to_string(),
        _ => match raw.parse::<usize>() {
            Ok(n @ 1..=9) => KEYCAPS[n - 1].to_string(),
            _ => raw.to_string(),
        },
    }
}

const HELP: &str = "\
commands:
  start <user> [channel]                   open a tic-tac-toe lobby
  react <user> <message> <emoji> [channel] react on a message (1-9, +, -)
  apps                                     list running apps
  quit                                     save and exit";

struct Host {
    engine: Engine,
    chat: Arc<ConsoleChat>,
    events: mpsc::Sender<ReactionAdd>,
    config: HostConfig,
}

impl Host {
    /// Returns `false` when the host should shut down.
    async fn execute(&self, command: Command) -> Result<bool, BoxError> {
        match command {
            Command::Start { user, channel } => {
                let game = Game::new(Member::new(user.as_str(), user.as_str()));
                match self
                    .engine
                    .start_app(
                        self.chat.clone(),
                        game,
                        GuildId::new(GUILD),
                        ChannelId::new(channel),
                        self.config.idle_timeout(),
                    )
                    .await
                {
                    Ok(instance) => println!("started {} ({})", instance.id(), Game::APP_ID),
                    Err(err) => {
                        error!(error = %err, "failed starting tic-tac-toe");
                        println!("failed starting: {err}");
                    }
                }
            }
            Command::React {
                user,
                message,
                emoji,
                channel,
            } => {
                let event = ReactionAdd::new(
                    UserId::new(user),
                    ChannelId::new(channel),
                    MessageId::new(message),
                    emoji,
                );
                self.events.send(event).await?;
            }
            Command::Apps => {
                let instances = self.engine.instances().await;
                if instances.is_empty() {
                    println!("no running apps");
                }
                for instance in instances {
                    println!(
                        "{}  {}  #{}",
                        instance.id(),
                        instance.app_id(),
                        instance.channel_id()
                    );
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), BoxError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = HostConfig::load(&config_path).await?.apply_env()?;
    info!(config = %config_path, state = %config.state_path.display(), "configuration loaded");

    let engine = EngineBuilder::new()
        .register::<Game>()?
        .expect_apps(&[Game::APP_ID])
        .config(&config)
        .build()?;

    let chat = Arc::new(ConsoleChat::new());
    let restored = engine.restore_apps(chat.clone()).await?;
    if restored > 0 {
        println!("restored {restored} app(s)");
    }
    for instance in engine.instances().await {
        for action in instance.read_context().await.actions() {
            chat.reserve(&action.message_id);
        }
    }

    let cancel = CancellationToken::new();
    let sweeper = engine.spawn_idle_sweeper(config.sweep_interval(), cancel.clone());
    let (events, receiver) = mpsc::channel(64);
    let event_loop = engine.spawn_event_loop(receiver);

    let host = Host {
        engine: engine.clone(),
        chat,
        events,
        config,
    };
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        if !host.execute(command).await? {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
        }
    }

    info!("shutting down, saving all running apps");
    drop(host);
    cancel.cancel();
    if let Err(err) = sweeper.await {
        warn!(error = %err, "idle sweeper ended abnormally");
    }
    if let Err(err) = event_loop.await {
        warn!(error = %err, "event loop ended abnormally");
    }
    engine.stop_and_save_states().await?;
    info!("all apps saved");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "reacthost failed");
            ExitCode::FAILURE
        }
    }
}
