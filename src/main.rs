//! Headless idle-miner client (default binary).
//!
//! Connects to the game server, keeps the connection alive, and prints a
//! status line whenever the reconciled view changes. Commands are read from
//! stdin; logs go to stderr so stdout stays clean for status lines.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use idle_miner::console::{self, ConsoleCommand, HELP};
use idle_miner::transport::{Client, ClientConfig, WsConnector};

#[derive(Parser, Debug)]
#[command(name = "idle-miner", version, about = "Headless idle-mining client")]
struct Args {
    /// Server base URL (overrides IDLE_MINER_WS_URL)
    #[arg(long)]
    url: Option<String>,
    /// Player id (overrides IDLE_MINER_PLAYER_ID)
    #[arg(long)]
    player: Option<String>,
    /// Reconnect delay in milliseconds (overrides IDLE_MINER_RECONNECT_MS)
    #[arg(long)]
    reconnect_ms: Option<u64>,
    /// Append every frame to this file (overrides IDLE_MINER_WIRE_LOG)
    #[arg(long)]
    wire_log: Option<String>,
}

impl Args {
    fn into_config(self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = self.url {
            config.server_url = url;
        }
        if let Some(player) = self.player {
            config.player_id = Some(player);
        }
        if let Some(ms) = self.reconnect_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(path) = self.wire_log {
            config.wire_log_path = Some(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config(ClientConfig::from_env());
    info!(endpoint = %config.endpoint(), "starting client");

    let client = Client::start(WsConnector, &config);
    let result = run(&client).await;

    client.shutdown().await;
    result
}

async fn run(client: &Client) -> Result<()> {
    let mut views = client.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut stdin_open = true;

    println!("{}", console::render(&views.borrow_and_update()));

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                println!("{}", console::render(&views.borrow_and_update()));
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Keep rendering until Ctrl-C.
                    stdin_open = false;
                    continue;
                };
                match console::parse(&line) {
                    ConsoleCommand::Dispatch(command) => {
                        if let Err(e) = client.dispatch(command) {
                            warn!(error = %e, "command not sent");
                        }
                    }
                    ConsoleCommand::Show => println!("{}", console::render(&client.view())),
                    ConsoleCommand::Help => println!("{HELP}"),
                    ConsoleCommand::Quit => return Ok(()),
                    ConsoleCommand::Empty => {}
                    ConsoleCommand::Invalid(usage) => println!("{usage}"),
                    ConsoleCommand::Unknown(verb) => println!("unknown command: {verb} (try 'help')"),
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
