mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aoc-bench-cli")]
#[command(about = "aoc-bench CLI - Scaffold days, inspect solutions and datasets", long_about = None)]
struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the solution directories and starter files for a day
    AddDay {
        /// Day number (1-25)
        day: u32,

        /// Model to scaffold under ai-solutions (repeatable)
        #[arg(short, long = "model")]
        models: Vec<String>,
    },

    /// List discovered solutions without running them
    List {
        /// Only this task (e.g. 1 or 01)
        #[arg(short, long)]
        task: Option<String>,
    },

    /// Print the summary of a written dataset
    Summary {
        /// Dataset file (defaults to the runner's default output)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match cli.command {
        Commands::AddDay { day, models } => {
            commands::add_day(&root, day, &models).await?;
        }
        Commands::List { task } => {
            commands::list_solutions(&root, task.as_deref()).await?;
        }
        Commands::Summary { dataset } => {
            commands::show_summary(&root, dataset).await?;
        }
    }

    Ok(())
}
