use comfy_table::Table;
use staleguard_auth::{token_for, KeyringStore, Service};
use staleguard_core::config::StaleguardConfig;
use staleguard_registry::snyk::SnykRegistry;
use staleguard_registry::Registry;

pub async fn run() -> anyhow::Result<()> {
    let config = StaleguardConfig::load()?;
    let token = token_for(Service::Snyk, &config, &KeyringStore::new())?;
    let registry = SnykRegistry::from_config(&config, &token)?;

    let orgs = registry.list_organizations().await?;
    if orgs.is_empty() {
        println!("No organizations visible to this token.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "NAME", "SLUG", "SELECTED"]);
    for org in &orgs {
        let selected = config.orgs.is_empty() || config.orgs.iter().any(|s| org.matches(s));
        table.add_row(vec![
            org.id.to_string(),
            org.name.clone(),
            org.slug.clone().unwrap_or_else(|| "—".to_string()),
            if selected { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
