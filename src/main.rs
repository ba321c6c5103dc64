use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use worthwatch::app::{config_output, App};
use worthwatch::config::{default_config_path, ResolvedConfig};

#[derive(Parser)]
#[command(name = "worthwatch")]
#[command(about = "Daily net-worth valuation and notifications")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Value the portfolio and send the notification now
    Now,

    /// Send the notification every day at HOUR:MINUTE until interrupted
    Schedule {
        #[arg(value_parser = clap::value_parser!(u32).range(0..=23), requires = "minute")]
        hour: Option<u32>,
        #[arg(value_parser = clap::value_parser!(u32).range(0..=59))]
        minute: Option<u32>,
    },

    /// Send a sample notification through every configured channel
    Test,

    /// Check the Telegram bot token and chat
    TelegramCheck,

    /// Value the portfolio without notifying
    Value,

    /// Inspect stored daily snapshots
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Snapshots from the last DAYS days
    Recent {
        #[arg(default_value_t = 7)]
        days: u32,
    },
    /// Today's snapshot
    Today,
    /// Most recent snapshot
    Latest,
    /// Best, worst, average and growth over all snapshots
    Stats,
    /// Delete snapshots older than DAYS days
    Cleanup { days: u32 },
}

fn init_tracing(json: bool) {
    let json_layer = json.then(|| fmt::layer().with_writer(std::io::stderr).json());
    let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_schedule(app: &App, hour: u32, minute: u32) -> Result<()> {
    let scheduler = app.scheduler().await;
    let fire_at = scheduler.start(hour, minute, app.cycle()).await?;
    info!(
        first_fire = %fire_at.to_rfc3339(),
        channels = ?scheduler.dispatcher().channel_names(),
        "scheduler running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.stop();
    scheduler.join().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    if let Command::Config = cli.command {
        return print_json(&config_output(&cli.config, &config));
    }

    let schedule = config.schedule.clone();
    let app = App::from_config(config)?;

    match cli.command {
        Command::Now => print_json(&app.send_now().await?),
        Command::Schedule { hour, minute } => {
            run_schedule(
                &app,
                hour.unwrap_or(schedule.hour),
                minute.unwrap_or(schedule.minute),
            )
            .await
        }
        Command::Test => print_json(&app.send_test().await?),
        Command::TelegramCheck => print_json(&app.telegram_check().await?),
        Command::Value => print_json(&app.value().await?),
        Command::History { command } => match command {
            HistoryCommand::Recent { days } => print_json(&app.history_recent(days).await?),
            HistoryCommand::Today => print_json(&app.history_today().await?),
            HistoryCommand::Latest => print_json(&app.history_latest().await?),
            HistoryCommand::Stats => print_json(&app.history_stats().await?),
            HistoryCommand::Cleanup { days } => print_json(&app.history_cleanup(days).await?),
        },
        Command::Config => Ok(()),
    }
}
