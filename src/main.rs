use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use confluence::app::AppContext;
use confluence::cli::{commands, Cli, Commands};
use confluence::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Refresh { force } => {
            commands::refresh(&ctx, force).await?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
        Commands::List { limit } => {
            commands::list(&ctx, limit).await?;
        }
        Commands::Sources => {
            commands::sources(&ctx)?;
        }
        Commands::Export { format, output } => {
            commands::export(&ctx, format, output.as_deref())?;
        }
        Commands::Import { path } => {
            commands::import(&ctx, &path)?;
        }
        Commands::Daemon {
            hour,
            no_initial_update,
        } => {
            commands::daemon(Arc::new(ctx), hour, no_initial_update).await?;
        }
        Commands::Clear => {
            commands::clear(&ctx)?;
        }
    }

    Ok(())
}
