mod blog_api;
mod cli;
mod commands;
mod config;
mod db;
mod error;
mod export;
mod history;
mod image_search;
mod metadata;
mod session;
mod share;

use crate::cli::{Cli, Commands};
use crate::commands::AppContext;
use crate::error::Result;

use clap::Parser;
use tracing_subscriber::EnvFilter;

// Logs go to stderr so streamed text on stdout stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// application entry point
#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = try_main().await {
        eprintln!("❌ Error: {}", err);
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => db::default_db_path()?,
    };
    let db_conn = db::init_db(&db_path)?;

    let overrides = cli.overrides();
    let load = || AppContext::load(db_conn.clone(), &overrides);

    match cli.command {
        // Config commands must work even when stored settings are invalid
        Commands::Config(config_command) => commands::config(&db_conn, config_command).await?,
        Commands::Generate { prompt, no_images } => {
            commands::generate(&load().await?, &prompt.join(" "), !no_images).await?
        }
        Commands::History { rerun } => commands::history(&load().await?, rerun, true).await?,
        Commands::Last => commands::last(&load().await?).await?,
        Commands::Export { format, output } => {
            commands::export(&load().await?, format, output.as_deref()).await?
        }
        Commands::Share { platform } => {
            commands::share(&load().await?, platform.as_deref()).await?
        }
        Commands::Copy => commands::copy(&load().await?).await?,
    }

    Ok(())
}
