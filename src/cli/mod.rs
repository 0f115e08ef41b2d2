pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::export::ExportFormat;

#[derive(Parser)]
#[command(name = "confluence")]
#[command(about = "Aggregate news sources into one fresh feed", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/confluence/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh every enabled source now
    Refresh {
        /// Ignore per-source caches
        #[arg(short, long)]
        force: bool,
    },
    /// Show when the feed was last refreshed and what a load would do
    Status,
    /// Print the merged feed, refreshing first if it is stale
    List {
        /// Maximum number of items to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List configured sources
    Sources,
    /// Export the feed and configuration
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON export, replacing configuration and feed
    Import {
        /// Path to the JSON export
        path: PathBuf,
    },
    /// Run the daily refresh scheduler in the foreground
    Daemon {
        /// Local hour (0-23) of the daily refresh (default: from config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,

        /// Skip the refresh on start
        #[arg(long)]
        no_initial_update: bool,
    },
    /// Delete all stored data, caches included
    Clear,
}
