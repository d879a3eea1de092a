//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, sets up logging and either
//! edits the config file or starts the interactive chat.

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::app::App;
use crate::core::chat_stream::ResponseStreamEngine;
use crate::core::config::{path_display, Config, ConfigError, ConfigKey};
use crate::core::modes::{find_mode, Mode};
use crate::core::session::{Provider, SessionConfig};
use crate::ui::chat_loop::run_chat;

/// Holds the log filter applied with `--log`.
const LOG_ENV: &str = "NEURALTERM_LOG";

#[derive(Parser)]
#[command(name = "neuralterm")]
#[command(about = "A terminal chat client for Gemini and local Ollama models")]
#[command(
    long_about = "NeuralTerm is a line-oriented terminal chat client. It talks to Gemini \
in the cloud (with search grounding) or to a local Ollama server, and can attach \
documents as context for every turn.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY       API key for the cloud provider (required for gemini)\n\
  GEMINI_BASE_URL      Custom cloud API base URL (optional)\n\
  NEURALTERM_LOG       Log filter used with --log (default: debug)\n\n\
Controls:\n\
  Enter                Send the line\n\
  Up/Down              Recall earlier input\n\
  Esc                  Clear the line\n\
  Ctrl+C / Ctrl+D      Quit\n\n\
Type 'help' inside the chat for the command list."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Provider to start with (gemini or local)
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<Provider>,

    /// Model to start with; also becomes the default for `connect`
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Local server URL; also becomes the default for `connect local`
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Mode to start in
    #[arg(long, global = true, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Write debug logs to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

fn parse_mode(value: &str) -> Result<Mode, String> {
    find_mode(value)
        .map(|spec| spec.mode)
        .ok_or_else(|| format!("unknown mode: {value}"))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    match &args.command {
        Some(Commands::Set { key, value }) => {
            let key: ConfigKey = key.parse()?;
            let mut config = Config::load()?;
            if value.is_empty() {
                print_config(&config)?;
                return Ok(());
            }
            let value = value.join(" ");
            config.set(key, &value)?;
            config.save()?;
            println!("✅ Set {key} to: {}", config.get(key).unwrap_or(value.as_str()));
            Ok(())
        }
        Some(Commands::Unset { key }) => {
            let key: ConfigKey = key.parse()?;
            let mut config = Config::load()?;
            if config.unset(key) {
                config.save()?;
                println!("✅ Unset {key}");
            } else {
                println!("{key} was not set");
            }
            Ok(())
        }
        Some(Commands::Config) => {
            let config = Config::load()?;
            print_config(&config)
        }
        Some(Commands::Chat) | None => {
            let config = Config::load()?;
            let app = build_app(&config, &args)?;
            run_chat(app, ResponseStreamEngine::from_env()).await
        }
    }
}

fn print_config(config: &Config) -> Result<(), Box<dyn Error>> {
    println!("Config file: {}", path_display(Config::config_path()?));
    for line in config.describe() {
        println!("  {line}");
    }
    Ok(())
}

/// Logs go to a file only when `--log` is given; otherwise warnings and
/// errors reach stderr.
fn init_tracing(log: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let builder = tracing_subscriber::fmt().with_target(false);
    let result = match log {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_env_filter(
                    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("debug")),
                )
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Err(err) = result {
        eprintln!("⚠️  Logging disabled: {err}");
    }
    Ok(())
}

/// Build the initial application state from the config file and flags.
/// Flags win over config; `--model` and `--url` also become what `connect`
/// falls back to for the chosen provider.
pub fn build_app(config: &Config, args: &Args) -> Result<App, ConfigError> {
    let provider = match args.provider {
        Some(provider) => provider,
        None => config.provider()?,
    };
    let mode = match args.mode {
        Some(mode) => mode,
        None => config.mode()?,
    };

    let mut defaults = config.connection_defaults();
    if let Some(url) = &args.url {
        defaults.local_url = url.clone();
    }
    if let Some(model) = &args.model {
        match provider {
            Provider::Cloud => defaults.cloud_model = model.clone(),
            Provider::Local => defaults.local_model = model.clone(),
        }
    }

    let model = match provider {
        Provider::Cloud => defaults.cloud_model.clone(),
        Provider::Local => defaults.local_model.clone(),
    };
    let session = SessionConfig::new(
        provider,
        model,
        defaults.local_url.clone(),
        Mode::Chat.instruction(),
    );
    let mut app = App::new(session, defaults);
    app.set_mode(mode);
    Ok(app)
}
