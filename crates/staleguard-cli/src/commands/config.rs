use clap::Subcommand;
use staleguard_core::config::StaleguardConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create ~/.staleguard/ with a default config
    Init,
    /// Show current configuration
    Show,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = StaleguardConfig::init()?;
            println!("Initialized staleguard at {}", StaleguardConfig::home_dir()?.display());
            println!("  config: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = StaleguardConfig::load()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
            Ok(())
        }
    }
}
