//! CLI entry point for the dock alert tool.
//!
//! With no subcommand it checks the configured station and emails its status.

use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dock_alert::{
    config::Config,
    fetch::BasicClient,
    lookup::StationLookup,
    monitor::check_and_notify,
    notify::{
        ClientSecrets, FileTokenStore, GmailMailer, Notifier, TokenStore, authorization_url,
        exchange_code,
    },
    output::list_stations,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "dock_alert")]
#[command(about = "Email alerts when a cycle hire station runs low on empty docks", long_about = None)]
struct Cli {
    /// Feed URL or path to a saved feed file (overrides FEED_URL)
    #[arg(long, global = true, value_name = "FILE_OR_URL")]
    feed: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configured station and email its status (the default)
    Check,
    /// List stations, optionally filtered by a case-insensitive search
    List {
        /// Search words, joined with spaces
        #[arg(value_name = "SEARCH")]
        terms: Vec<String>,
    },
    /// Authorize sending mail through Gmail and store the token
    Authorize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/dock_alert.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("dock_alert.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(feed) = cli.feed {
        config.feed_source = feed;
    }

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            let lookup = StationLookup::new(
                BasicClient::with_timeout(config.feed_timeout)?,
                config.feed_source.clone(),
            );
            let mailer = GmailMailer::new(
                BasicClient::new()?,
                FileTokenStore::new(&config.token_path),
            );
            let notifier = Notifier::new(mailer, config.recipient.clone());

            let sent =
                check_and_notify(&lookup, &notifier, &config.station_name, config.threshold).await;
            if !sent {
                warn!(station = %config.station_name, "No notification sent");
            }
        }
        Commands::List { terms } => {
            let lookup = StationLookup::new(
                BasicClient::with_timeout(config.feed_timeout)?,
                config.feed_source.clone(),
            );
            list_stations(&lookup, &terms).await;
        }
        Commands::Authorize => authorize(&config).await?,
    }

    Ok(())
}

/// Walks through the one-time consent flow and saves the resulting token.
async fn authorize(config: &Config) -> Result<()> {
    let secrets = ClientSecrets::load(&config.credentials_path)?;

    println!("Open this URL in a browser and allow access:\n");
    println!("{}\n", authorization_url(&secrets)?);
    println!("After approving, paste the code (or the full URL you were redirected to):");
    print!("> ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    let client = BasicClient::new()?;
    let token = exchange_code(&client, &secrets, &input).await?;

    let store = FileTokenStore::new(&config.token_path);
    store.save(&token)?;
    info!(path = %store.path().display(), "Gmail token saved");
    println!("Authorized. Token saved to {}", store.path().display());

    Ok(())
}
