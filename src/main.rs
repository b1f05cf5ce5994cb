//! # Standbot: Daily Standup Bot
//!
//! Members DM their updates to the bot; once per schedule tick every team gets
//! one summary in its standup channel and the responses are cleared.
//!
//! Usage:
//!   standbot                         # Connect to Discord and run the scheduler
//!   standbot --config ./bot.toml     # Custom config file
//!   standbot cycle                   # Run one summary cycle now and exit

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use standbot_channels::{DiscordChannel, DiscordGateway};
use standbot_core::StandbotConfig;
use standbot_core::traits::{StandupStore, Transport};
use standbot_engine::{CommandRegistry, Segmenter, StandupBot};
use standbot_scheduler::{CronSchedule, GroupOutcome, SchedulerEngine, open_store, spawn_scheduler};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "standbot", version, about = "📋 Standbot — Daily Standup Bot")]
struct Cli {
    /// Config file (default: ~/.standbot/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for commands and post summaries on schedule (default)
    Run,
    /// Run one summary cycle immediately and exit
    Cycle,
}

fn load_config(path: Option<&str>) -> Result<StandbotConfig> {
    let mut config = match path {
        Some(p) => {
            let path = PathBuf::from(shellexpand::tilde(p).to_string());
            let mut config = StandbotConfig::load_from(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.apply_env();
            config
        }
        None => StandbotConfig::load()?,
    };
    config.validate()?;
    if config.discord.bot_token.is_empty() {
        anyhow::bail!("no Discord bot token: set DISCORD_TOKEN or [discord].bot_token");
    }
    // Keep the store path absolute for logging
    config.store.path = config.store.expanded_path().to_string_lossy().into_owned();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Initialize logging
    let filter = if cli.verbose || config.debug {
        "standbot=debug,standbot_core=debug,standbot_engine=debug,standbot_scheduler=debug,standbot_channels=debug"
    } else {
        "standbot=info,standbot_core=info,standbot_engine=info,standbot_scheduler=info,standbot_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let store = open_store(&config.store)?;
    let discord = Arc::new(DiscordChannel::new(&config.discord));
    let segmenter = Segmenter::new(config.summary.line_limit, config.summary.segment_limit);
    let engine = Arc::new(SchedulerEngine::new(store.clone(), discord.clone(), segmenter));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Cycle => run_once(&engine).await,
        Commands::Run => run(config, store, discord, engine).await,
    }
}

async fn run_once(engine: &SchedulerEngine) -> Result<()> {
    let report = engine.run_cycle().await;
    if let Some(e) = report.fetch_error {
        anyhow::bail!("could not load standups: {e}");
    }
    for group in &report.groups {
        match &group.outcome {
            GroupOutcome::Cleared { entries, missing } => {
                println!("✅ {}: {entries} entries, {missing} missing", group.group_id)
            }
            other => println!("❌ {}: {other:?}", group.group_id),
        }
    }
    Ok(())
}

async fn run(
    config: StandbotConfig,
    store: Arc<dyn StandupStore>,
    discord: Arc<DiscordChannel>,
    engine: Arc<SchedulerEngine>,
) -> Result<()> {
    let me = discord.get_me().await?;
    tracing::info!("📋 Logged in as {} ({})", me.username, me.id);

    if config.schedule.enabled {
        let schedule = CronSchedule::parse(&config.schedule.expression)?;
        tokio::spawn(spawn_scheduler(engine, schedule));
    } else {
        tracing::warn!("Daily summary schedule disabled");
    }

    let transport: Arc<dyn Transport> = discord;
    let bot = StandupBot::new(
        CommandRegistry::standard(),
        store,
        transport,
        config.prefix.clone(),
        config.summary.clone(),
    );
    tracing::info!(
        "Listening for {} commands with prefix '{}'",
        bot.registry().len(),
        config.prefix
    );

    let mut events = DiscordGateway::new(&config.discord).start();
    while let Some(event) = events.next().await {
        bot.handle_event(event).await;
    }
    tracing::info!("Gateway stream ended, shutting down");
    Ok(())
}
