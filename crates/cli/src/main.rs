mod commands;
mod config;
mod progress;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "imgstore",
    version,
    about = "Image storage on local disk or S3-compatible buckets"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        commands::Command::Init(args) => commands::init::run(args).await,
        commands::Command::Upload(args) => commands::upload::run(args).await,
        commands::Command::List(args) => commands::list::run(args).await,
        commands::Command::Get(args) => commands::get::run(args).await,
        commands::Command::Delete(args) => commands::delete::run(args).await,
        commands::Command::Info(args) => commands::info::run(args).await,
    }
}
