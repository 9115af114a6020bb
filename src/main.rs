use anyhow::{Context, Result};
use cider_listenbrainz::{
    ConfigBridge, EventBridge, FileSettingsStore, HostNotification, HostState, ListenBrainzSubmitter,
    PLUGIN_IDENTIFIER,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "cider-listenbrainz", version, about)]
struct Cli {
    /// Settings document to read and persist (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed recorded host notifications (one JSON object per line) through the event bridge
    Replay {
        /// Read notifications from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Inspect or change the plugin settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged configuration
    Show,

    /// Change one or more settings; every change is saved immediately
    Set {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        use_apple_music_client_name: Option<bool>,
    },
}

fn mask(token: &str) -> String {
    if token.is_empty() {
        "<unset>".to_string()
    } else {
        format!("{}...", token.chars().take(4).collect::<String>())
    }
}

async fn replay(config: Arc<ConfigBridge>, input: Option<PathBuf>) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {:?}", path))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let host = Arc::new(HostState::new());
    let bridge = EventBridge::new(config, host.clone(), ListenBrainzSubmitter::new());

    let mut lines = reader.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read notifications")? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let notification: HostNotification = match serde_json::from_str(&line) {
            Ok(notification) => notification,
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_number, e);
                continue;
            }
        };

        host.apply(&notification);
        bridge.dispatch(notification.event).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let settings_path = match cli.settings {
        Some(path) => path,
        None => FileSettingsStore::default_path()?,
    };
    log::debug!("Using settings file {:?}", settings_path);

    let config = ConfigBridge::setup(Box::new(FileSettingsStore::new(settings_path)), PLUGIN_IDENTIFIER)?;

    match cli.command {
        Command::Replay { input } => replay(Arc::new(config), input).await?,
        Command::Config { action: ConfigAction::Show } => {
            let current = config.get();
            println!("[{}]", config.identifier());
            println!("url = {}", current.url);
            println!("apiKey = {}", mask(&current.api_key));
            println!("useAppleMusicClientName = {}", current.use_apple_music_client_name);
            println!("enabled = {}", current.enabled);
        }
        Command::Config {
            action:
                ConfigAction::Set {
                    url,
                    api_key,
                    enabled,
                    use_apple_music_client_name,
                },
        } => {
            config.update(|cfg| {
                if let Some(url) = url {
                    cfg.url = url;
                }
                if let Some(api_key) = api_key {
                    cfg.api_key = api_key;
                }
                if let Some(enabled) = enabled {
                    cfg.enabled = enabled;
                }
                if let Some(use_apple_music_client_name) = use_apple_music_client_name {
                    cfg.use_apple_music_client_name = use_apple_music_client_name;
                }
            })?;
        }
    }

    Ok(())
}
