use clap::Args;
use console::style;
use staleguard_auth::{token_for, KeyringStore, Service};
use staleguard_core::config::StaleguardConfig;
use staleguard_core::models::classification::Classification;
use staleguard_core::repo_url;
use staleguard_host::github::GitHubProvider;
use staleguard_host::Inspector;

#[derive(Args)]
pub struct InspectArgs {
    /// Repository URL, e.g. https://github.com/owner/repo
    url: String,
    /// Days without a push before the repository counts as stale
    #[arg(long)]
    stale_days: Option<i64>,
}

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    let mut config = StaleguardConfig::load()?;
    if let Some(days) = args.stale_days {
        config.stale_days = days;
        config.validate()?;
    }

    let token = token_for(Service::GitHub, &config, &KeyringStore::new())?;
    let provider = GitHubProvider::new(&config.github_api_url, &token, config.request_timeout())?;
    let inspector = Inspector::new(&provider, config.stale_days, config.retry_policy());

    let classification = inspector.inspect(&args.url, chrono::Utc::now()).await;
    let styled = match &classification {
        Classification::Active => style(classification.to_string()).green(),
        Classification::Stale => style(classification.to_string()).yellow(),
        Classification::Archived => style(classification.to_string()).magenta(),
        Classification::Inaccessible(_) => style(classification.to_string()).red(),
    };

    println!("{}: {}", repo_url::normalize(&args.url), styled.bold());
    if let (Some(tag), Some(criticality)) = (
        classification.status_tag(&config.status_tag_key),
        classification.criticality(),
    ) {
        println!("  tag:         {tag}");
        println!("  criticality: {criticality}");
        println!(
            "  deactivate:  {}",
            if classification.is_archived() { "yes" } else { "no" }
        );
    } else {
        println!("  projects referencing it are left untouched");
    }
    Ok(())
}
