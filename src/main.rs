//! Signal group bot - CLI entry point.
//!
//! Provides subcommands to run the bot, execute a single command locally, and
//! inspect the configuration.

use anyhow::{Context, Result};
use clap::Parser;
use signal_group_bot::cli::{Cli, Commands};
use signal_group_bot::config::Config;
use signal_group_bot::{
    BotController, GroupStore, InboundMessage, MemoryTransport, SignalCliTransport, SqliteStore,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run(cli.config).await.context("Failed to run bot")?;
        }
        Commands::Exec { from, text } => {
            exec(cli.config, &from, &text.join(" "))
                .await
                .context("Failed to execute command")?;
        }
        Commands::Status => {
            print_status(cli.config).await?;
        }
    }

    Ok(())
}

/// Open the configured database, creating its directory if needed.
async fn open_store(config: &Config) -> Result<SqliteStore> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    SqliteStore::open(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))
}

async fn run(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = Config::load(config_path)?;
    let store = open_store(&config).await?;

    tracing::info!("Connecting to signal-cli at {}", config.signal.endpoint);
    let transport =
        SignalCliTransport::connect(&config.signal.endpoint, config.signal.number.as_deref())
            .await
            .context("Failed to connect to signal-cli")?;

    let bot = BotController::from_config(store, transport, &config.signal);

    tokio::select! {
        result = bot.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    bot.directory().store().close().await;
    Ok(())
}

async fn exec(config_path: Option<std::path::PathBuf>, from: &str, text: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let store = open_store(&config).await?;

    let bot = BotController::from_config(store, MemoryTransport::new(), &config.signal);
    bot.process(&InboundMessage::direct(from, text)).await;

    for message in bot.transport().sent() {
        println!("📨 {}:", message.recipient);
        println!("{}", message.text);
        println!();
    }

    bot.directory().store().close().await;
    Ok(())
}

/// Print configuration status.
async fn print_status(config_path: Option<std::path::PathBuf>) -> Result<()> {
    println!("📊 Signal Group Bot Status\n");

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Configuration: Not found or invalid");
            println!("   Error: {}", e);
            println!();
            println!(
                "Create config at {}:",
                signal_group_bot::config::default_config_path().display()
            );
            println!(r#"  {{"signal": {{"default_country_code": "49", "admin_users": ["0170..."]}}}}"#);
            return Ok(());
        }
    };

    println!("✅ Configuration: Found");
    println!(
        "   Account: {}",
        config.signal.number.as_deref().unwrap_or("(daemon default)")
    );
    println!("   Endpoint: {}", config.signal.endpoint);
    println!("   Country code: +{}", config.signal.default_country_code);
    println!("   Admins: {}", config.signal.admin_users.len());
    println!();
    println!("🗄️  Database: {}", config.database.url);

    match open_store(&config).await {
        Ok(store) => {
            match store.list_groups().await {
                Ok(groups) => println!("   Groups: {}", groups.len()),
                Err(e) => println!("   Error: {}", e),
            }
            store.close().await;
        }
        Err(e) => println!("   Status: Unavailable ({:#})", e),
    }

    Ok(())
}
