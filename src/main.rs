mod api;
mod branding;
mod bridge;
mod commands;
mod config;
mod crypto;
mod player;
mod session;
mod shell;
mod state;
mod views;

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::{Overrides, Settings};
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "streamsauce")]
#[command(about = "StreamSauce subscription-gated IPTV client")]
struct Cli {
    /// Licensing server base URL (overrides STREAMSAUCE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// External player program, mpv or ffplay (overrides STREAMSAUCE_PLAYER)
    #[arg(long, global = true)]
    player: Option<String>,

    /// Directory for the session record (overrides STREAMSAUCE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Submit this subscription key immediately
    #[arg(long, global = true)]
    key: Option<String>,

    /// Re-validate the key stored by the last successful login
    #[arg(long, global = true)]
    resume: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive client (default)
    Run,
    /// Inspect or build licensing envelopes
    Envelope {
        #[command(subcommand)]
        action: EnvelopeAction,
    },
}

#[derive(Subcommand, Debug)]
enum EnvelopeAction {
    /// Decrypt a base64 envelope (argument or stdin) and print the JSON
    Decrypt { data: Option<String> },
    /// Seal a JSON payload (argument or stdin) into a base64 envelope
    Seal { payload: Option<String> },
}

fn read_arg_or_stdin(value: Option<String>) -> std::io::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim().to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    env_logger::init();

    let cli = Cli::parse();
    let overrides = Overrides {
        api_url: cli.api_url,
        player: cli.player,
        data_dir: cli.data_dir,
    };
    let settings = Settings::resolve(&overrides)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            log::info!("StreamSauce starting...");
            let state = AppState::from_settings(&settings);
            log::info!("Licensing server: {}", state.license.transport().base_url());
            log::info!("Player: {}", settings.player);
            log::debug!("Session record: {}", state.bridge.path().display());

            shell::run(state, &settings, cli.key, cli.resume).await?;
        }
        Command::Envelope { action } => match action {
            EnvelopeAction::Decrypt { data } => {
                let data = read_arg_or_stdin(data)?;
                let plaintext = crypto::decrypt_envelope(&data, &settings.envelope_key)?;
                println!("{}", plaintext);
            }
            EnvelopeAction::Seal { payload } => {
                let payload = read_arg_or_stdin(payload)?;
                let sealed = crypto::seal_envelope(&payload, &settings.envelope_key)?;
                println!("{}", sealed);
            }
        },
    }

    Ok(())
}
