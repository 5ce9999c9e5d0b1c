use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use rustplus_client::protocol::{AppMarker, AppMarkerType};
use rustplus_client::{Client, ClientConfig, ClientError, ClientEvent, ConfigError, Pairing, PairingError};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("pairing failed: {0}")]
    Pairing(#[from] PairingError),
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("failed to wait for ctrl-c: {0}")]
    Signal(std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "rustplus", about = "Rust+ companion protocol client")]
struct Cli {
    /// Per-request deadline; defaults to RUST_TIMEOUT_MS or 10000.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Server name, map, and player counts.
    Info,
    /// In-game time of day.
    Time,
    /// Map metadata and monuments.
    Map {
        /// Also write the map image to this path.
        #[arg(long)]
        jpg: Option<PathBuf>,
    },
    /// Every map marker.
    Markers,
    /// Vending machine markers only.
    Vending,
    Team,
    Chat,
    /// Post a team chat message.
    Say { text: String },
    Entity { entity_id: u32 },
    /// Turn a smart switch on or off.
    Switch { entity_id: u32, state: SwitchState },
    /// Print connection events and broadcasts until ctrl-c.
    Listen,
    /// Write pairing details (inline JSON or a file path) into an env file.
    Pair {
        pairing: String,
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SwitchState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Command::Pair { pairing, env_file } = &cli.command {
        return run_pair(pairing, env_file);
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(ms) = cli.timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }
    let client = Client::new(config);

    let result = run(&client, cli.command).await;
    client.shutdown();
    result
}

async fn run(client: &Client, command: Command) -> Result<(), CliError> {
    match command {
        Command::Info => print_json(&client.get_info(None).await?),
        Command::Time => print_json(&client.get_time(None).await?),
        Command::Map { jpg } => {
            let map = client.get_map_raw(None).await?;
            if let Some(path) = jpg {
                std::fs::write(&path, &map.jpg_image).map_err(|source| CliError::Write { path: path.clone(), source })?;
                info!(path = %path.display(), bytes = map.jpg_image.len(), "wrote map image");
            }
            print_json(&map)
        }
        Command::Markers => print_json(&client.get_map_markers_raw(None).await?),
        Command::Vending => {
            let markers = client.get_map_markers_raw(None).await?;
            print_json(&vending_machines(markers.markers))
        }
        Command::Team => print_json(&client.get_team_info(None).await?),
        Command::Chat => print_json(&client.get_team_chat(None).await?),
        Command::Say { text } => {
            client.send_team_message(&text, None).await?;
            println!("ok");
            Ok(())
        }
        Command::Entity { entity_id } => print_json(&client.get_entity_info(entity_id, None).await?),
        Command::Switch { entity_id, state } => {
            client.set_entity_value(entity_id, matches!(state, SwitchState::On), None).await?;
            println!("ok");
            Ok(())
        }
        Command::Listen => listen(client).await,
        Command::Pair { pairing, env_file } => run_pair(&pairing, &env_file),
    }
}

async fn listen(client: &Client) -> Result<(), CliError> {
    let mut events = client.subscribe();
    client.connect(client.config().request_timeout).await?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(CliError::Signal)?;
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(ClientEvent::Message(message)) => print_json(&message)?,
                Ok(ClientEvent::Error(error)) => warn!(error = %error, "client error"),
                Ok(event) => info!(?event, "connection event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

fn run_pair(pairing: &str, env_file: &Path) -> Result<(), CliError> {
    let pairing = Pairing::load(pairing)?;
    pairing.apply_to_env_file(env_file)?;
    println!("Updated {} with pairing details.", env_file.display());
    Ok(())
}

fn vending_machines(markers: Vec<AppMarker>) -> Vec<AppMarker> {
    markers
        .into_iter()
        .filter(|marker| marker.r#type() == AppMarkerType::VendingMachine)
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
