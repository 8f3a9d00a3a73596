use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod evidence;
mod github;
mod judge;
mod media;
mod models;
mod output;
mod rubric;
mod runner;
mod score;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// AI hackathon judge - score projects against a weighted rubric using two
/// independent LLM judges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file (judges, rubric, projects)
    run_file: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - show per-stage progress
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::from_file(&args.run_file)?;
    let runner = Runner::new(config.clone())?;

    let results = runner.run().await?;

    output::print_results(&results, &config.rubric, args.output);

    Ok(())
}
