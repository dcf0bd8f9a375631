//! Main entry point for Clipboard Translator CLI

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipboard_translator::cli::commands::{self, Commands, ConfigAction};
use clipboard_translator::core::config::Settings;
use clipboard_translator::providers::ProviderKind;

/// Clipboard Translator - translate copied text in place
#[derive(Parser, Debug)]
#[command(name = "clipboard-translator", version, about, long_about = None)]
struct Args {
    /// API key for the selected service (optional, defaults to GEMINI_API_KEY / OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Translation service: gemini, openai or free
    #[arg(long)]
    service: Option<ProviderKind>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clipboard_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings_path = args.config.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_or_default(&settings_path);

    // CLI args win over the settings file
    if let Some(service) = args.service {
        settings.preferred_service = service;
    }
    if let Some(api_key) = args.api_key {
        settings.set_active_api_key(api_key);
    }

    match args.command {
        Some(Commands::Watch {
            enabled,
            source,
            target,
            tone,
            service,
        }) => {
            commands::handle_watch(settings, settings_path, enabled, source, target, tone, service)
                .await?;
        }
        Some(Commands::Translate { text }) => {
            commands::handle_translate(settings, settings_path, text).await?;
        }
        Some(Commands::Tones { text }) => {
            commands::handle_tones(settings, text).await?;
        }
        Some(Commands::Check) => {
            commands::handle_check(settings).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::handle_config_show(&settings)?,
            ConfigAction::Path => commands::handle_config_path(&settings_path)?,
        },
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
