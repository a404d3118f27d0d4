//! Talkey - push-to-talk speech-to-text client
//!
//! Run with `talkey` or `talkey daemon` to start the client.
//! Use `talkey health` to check the transcription server.
//! Use `talkey config` to print the resolved configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use talkey::config::{self, Overrides};
use talkey::error::TalkeyError;
use talkey::status::{cleanup_state_file, LogSink, StateFileSink, StatusSink};
use talkey::transcribe::remote::RemoteTranscriber;
use talkey::transcribe::Transcriber;
use talkey::{audio, hotkey, output, SessionController};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "talkey")]
#[command(author, version, about = "Push-to-talk speech-to-text client")]
#[command(long_about = "
Talkey is a push-to-talk speech-to-text client. Hold a hotkey to record,
release to send the audio to a remote Whisper server; the transcription is
copied to the clipboard (and optionally pasted at the cursor).

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Start the transcription server (e.g. docker compose up -d)
  4. Run: talkey

USAGE:
  Hold Ctrl+Shift+Space (default) while speaking, release to transcribe.
")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Override the transcription server URL
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Override the hotkey (e.g., SPACE, SCROLLLOCK, F13)
    #[arg(long, value_name = "KEY")]
    hotkey: Option<String>,

    /// Force a transcription language ("auto" for server detection)
    #[arg(long, value_name = "LANG")]
    language: Option<String>,

    /// Clipboard only (disable auto-paste)
    #[arg(long)]
    clipboard: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the push-to-talk client (default if no command specified)
    Daemon,

    /// Check whether the transcription server is reachable
    Health,

    /// Show the resolved configuration
    Config,

    /// Show the current daemon status (for Waybar/polybar integration)
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("talkey={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration and apply env + CLI overrides in one merge
    let overrides = Overrides::from_env().layered(Overrides {
        server_url: cli.server.clone(),
        hotkey: cli.hotkey.clone(),
        language: cli.language.clone(),
        clipboard_only: cli.clipboard,
    });
    let settings = config::load_settings(cli.config.as_deref())?.merged(&overrides);
    settings.validate()?;

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => run_daemon(settings).await?,

        Commands::Health => {
            let transcriber = RemoteTranscriber::new(&settings.server, &settings.audio)
                .map_err(TalkeyError::from)?;
            let url = settings.server.url.clone();
            let healthy = tokio::task::spawn_blocking(move || transcriber.check_health())
                .await
                .unwrap_or(false);
            if healthy {
                println!("Server at {} is healthy", url);
            } else {
                println!("Server at {} is not reachable", url);
                std::process::exit(1);
            }
        }

        Commands::Config => {
            if let Some(path) = config::Settings::default_path() {
                println!("# Config file: {}", path.display());
            }
            print!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Status => match settings.resolve_state_file() {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(state) => println!("{}", state.trim()),
                Err(_) => println!("not running"),
            },
            None => println!("state file disabled"),
        },
    }

    Ok(())
}

/// Wire up the components and run the controller until shutdown
async fn run_daemon(settings: talkey::Settings) -> Result<(), TalkeyError> {
    tracing::info!("Starting talkey");
    tracing::info!("Server: {}", settings.server.url);

    let state_path = settings.resolve_state_file();
    let status: Box<dyn StatusSink> = match state_path.clone() {
        Some(path) => {
            tracing::info!("State file: {:?}", path);
            Box::new(StateFileSink::new(path))
        }
        None => Box::new(LogSink),
    };

    let mut watcher = hotkey::create_watcher(&settings.hotkey)?;
    let capture = audio::create_capture(&settings.audio)?;
    let transcriber: Arc<dyn Transcriber> =
        Arc::new(RemoteTranscriber::new(&settings.server, &settings.audio)?);
    let outputs = output::create_output_chain(&settings.output);
    tracing::debug!(
        "Output chain: {}",
        outputs
            .iter()
            .map(|o| o.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let hotkey_rx = watcher.start()?;

    let mut controller =
        SessionController::new(settings, capture, transcriber, status, outputs);
    let result = controller.run(hotkey_rx).await;

    watcher.stop();
    if let Some(ref path) = state_path {
        cleanup_state_file(path);
    }

    tracing::info!("Talkey stopped");
    result
}
