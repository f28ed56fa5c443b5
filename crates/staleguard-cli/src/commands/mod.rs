pub mod config;
pub mod inspect;
pub mod orgs;
pub mod run;
pub mod token;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Classify every repository, then tag and deactivate projects
    Run(run::RunArgs),
    /// Classify a single repository without touching any project
    Inspect(inspect::InspectArgs),
    /// List organizations visible to the platform token
    Orgs,
    /// Initialize and show staleguard configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Manage tokens stored in the OS keychain
    Token {
        #[command(subcommand)]
        action: token::TokenAction,
    },
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Run(args) => run::run(args).await,
        Command::Inspect(args) => inspect::run(args).await,
        Command::Orgs => orgs::run().await,
        Command::Config { action } => config::run(action),
        Command::Token { action } => token::run(action),
    }
}
