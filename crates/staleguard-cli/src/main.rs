mod commands;

use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "staleguard", version, about = "Tag and retire scan projects whose repositories went stale")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    commands::run(cli.command).await
}
