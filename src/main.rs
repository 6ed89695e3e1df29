use anyhow::Result;
use clap::Parser;

mod client;
mod config;
mod export;
mod types;

use client::ShowClient;
use config::Config;
use types::{Platform, ResourceType};

/// Download MLB The Show community market data to a spreadsheet
#[derive(Parser)]
#[command(name = "showstats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download MLB The Show community market data to a spreadsheet", long_about = None)]
struct Cli {
    /// Type of data to download (items, listings, captains, roster_updates, game_history)
    #[arg(short = 'd', long, default_value = "items")]
    datatype: ResourceType,

    /// Platform for game history downloads (psn, xbl, mlbts, nsw; default: psn)
    #[arg(short, long)]
    platform: Option<String>,

    /// Username for game history downloads (requires a platform)
    #[arg(short, long)]
    username: Option<String>,

    /// Output file name, extension included (.xlsx or .csv)
    #[arg(short, long)]
    filename: Option<String>,

    /// API host URL
    #[arg(long, env = "SHOWSTATS_HOST")]
    host: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = Config::load(
        cli.host.as_deref(),
        cli.platform.as_deref(),
        cli.username.as_deref(),
        cli.verbose,
    )?;

    println!(
        "~ Getting ready to download data from the MLB The Show API [{}]...",
        config.host
    );

    // The platform only matters for game history; validate it hard when it
    // is in play, ignore it otherwise.
    let platform = if cli.datatype == ResourceType::GameHistory || config.username.is_some() {
        Some(config.platform.parse::<Platform>()?)
    } else {
        None
    };

    let client = ShowClient::new(&config)?;
    let table = client
        .fetch_all(cli.datatype, platform, config.username.as_deref())
        .await?;

    println!(
        "~ Downloaded {} records (type: {})",
        table.len(),
        cli.datatype
    );
    if table.is_empty() {
        eprintln!("~ The API returned no records for type: {}", cli.datatype);
    }

    let outcome = export::export(&table, cli.filename.as_deref())?;

    if outcome.is_snapshot() {
        eprintln!(
            "~ Data could not be exported to '.xlsx' or '.csv'; a binary snapshot was created to prevent data loss [{}]",
            outcome.path().display()
        );
    } else {
        println!("~ Successfully exported data for MLB The Show [{outcome}]");
        println!("_____________\n|   Done!   |\n*-----------*");
    }

    Ok(())
}
