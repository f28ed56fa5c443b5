use clap::Subcommand;
use staleguard_auth::{CredentialStore, KeyringStore, Service};
use staleguard_core::config::StaleguardConfig;

#[derive(Subcommand)]
pub enum TokenAction {
    /// Store a token in the OS keychain
    Set {
        /// snyk or github
        service: String,
        /// API token (will prompt if not provided)
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove a stored token
    Clear {
        /// snyk or github
        service: String,
    },
}

pub fn run(action: TokenAction) -> anyhow::Result<()> {
    let store = KeyringStore::new();
    match action {
        TokenAction::Set { service, token } => {
            let service: Service = service.parse().map_err(|e: String| anyhow::anyhow!(e))?;

            let token = match token {
                Some(t) => t.trim().to_string(),
                None => {
                    eprint!("Enter {service} API token: ");
                    let mut input = String::new();
                    std::io::stdin().read_line(&mut input)?;
                    input.trim().to_string()
                }
            };

            if token.is_empty() {
                anyhow::bail!("Token cannot be empty");
            }

            store.store(service.credential_key(), &token)?;
            let config = StaleguardConfig::load()?;
            println!(
                "Token stored in OS keychain as '{}' (used when {} is unset)",
                service.credential_key(),
                service.env_var(&config)
            );
            Ok(())
        }
        TokenAction::Clear { service } => {
            let service: Service = service.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            store.delete(service.credential_key())?;
            println!("Token for {service} removed");
            Ok(())
        }
    }
}
