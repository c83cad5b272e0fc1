use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod build;
mod commands;
mod config;
mod logger;
mod notion;
mod util;

#[derive(Parser)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: TablogCommand,
}

#[derive(Parser)]
struct GenerateArgs {
    /// Path to the site working directory
    #[arg(default_value = ".")]
    work_dir: PathBuf,

    /// Print more messages for debugging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Ignore the cache and fetch every page from Notion
    #[arg(long, default_value = "false")]
    fresh: bool,

    /// How many pages to fetch and render concurrently
    #[arg(short, long, default_value = "3")]
    concurrency: usize,
}

#[derive(Parser)]
struct PreviewArgs {
    /// Path to the site working directory
    #[arg(default_value = ".")]
    work_dir: PathBuf,

    /// The address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// The port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Open the site in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,
}

#[derive(Subcommand)]
enum TablogCommand {
    /// Generate the blog from the Notion table
    Generate(GenerateArgs),

    /// Serve the generated blog on a local port
    Preview(PreviewArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    match args.command {
        TablogCommand::Generate(args) => {
            commands::generate::run(&args).await?;
        }
        TablogCommand::Preview(args) => {
            commands::preview::run(&args).await?;
        }
    }

    Ok(())
}
