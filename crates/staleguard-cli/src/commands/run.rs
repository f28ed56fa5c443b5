use std::time::Duration;

use clap::Args;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use staleguard_auth::{Credentials, KeyringStore};
use staleguard_core::config::StaleguardConfig;
use staleguard_core::error::UpdateOutcome;
use staleguard_host::github::GitHubProvider;
use staleguard_host::Inspector;
use staleguard_registry::snyk::SnykRegistry;
use staleguard_sync::engine::{ReconcileEngine, RunOptions};
use staleguard_sync::report::{ProjectOutcome, RunReport};

#[derive(Args)]
pub struct RunArgs {
    /// Organization name, slug or id (repeatable). Defaults to the config list, then all orgs
    #[arg(long = "org")]
    orgs: Vec<String>,
    /// Dry run: classify and report without changing any project
    #[arg(long)]
    dry_run: bool,
    /// Days without a push before a repository counts as stale
    #[arg(long)]
    stale_days: Option<i64>,
    /// Exit non-zero when any project or organization failed
    #[arg(long)]
    fail_on_errors: bool,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = StaleguardConfig::load()?;
    if let Some(days) = args.stale_days {
        config.stale_days = days;
        config.validate()?;
    }
    let orgs = if args.orgs.is_empty() {
        config.orgs.clone()
    } else {
        args.orgs
    };

    let credentials = Credentials::resolve(&config, &KeyringStore::new())?;
    let registry = SnykRegistry::from_config(&config, &credentials.snyk_token)?;
    let provider = GitHubProvider::new(
        &config.github_api_url,
        &credentials.github_token,
        config.request_timeout(),
    )?;
    let inspector = Inspector::new(&provider, config.stale_days, config.retry_policy());

    let engine = ReconcileEngine::new(
        &registry,
        inspector,
        RunOptions {
            orgs,
            dry_run: args.dry_run,
            status_tag_key: config.status_tag_key.clone(),
        },
    )
    .with_progress(spinner());

    if args.dry_run {
        println!("Dry run: no project will be changed.");
    }
    let report = engine.run(chrono::Utc::now()).await?;
    print_report(&report);

    if args.fail_on_errors && report.has_failures() {
        anyhow::bail!("run finished with failures");
    }
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_report(report: &RunReport) {
    if report.projects.is_empty() {
        println!("No projects found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["ORG", "PROJECT", "REPOSITORY", "OUTCOME", "DETAIL"]);
        for p in &report.projects {
            table.add_row(vec![
                Cell::new(&p.org),
                Cell::new(&p.project),
                Cell::new(p.url.as_deref().unwrap_or("—")),
                Cell::new(p.outcome.label()).fg(outcome_color(&p.outcome)),
                Cell::new(detail(&p.outcome)),
            ]);
        }
        println!("{table}");
    }

    for failure in &report.org_failures {
        println!("Organization {} failed: {}", failure.org, failure.message);
    }

    let repos = &report.repositories;
    println!(
        "Repositories: {} active | {} stale | {} archived | {} inaccessible",
        repos.active, repos.stale, repos.archived, repos.inaccessible
    );
    let s = report.summary();
    println!(
        "Projects: {} tagged active | {} tagged inactive | {} deactivated | {} read-only | {} skipped | {} failed",
        s.tagged_active, s.tagged_inactive, s.deactivated, s.read_only, s.skipped, s.failed
    );
}

fn outcome_color(outcome: &ProjectOutcome) -> Color {
    match outcome {
        ProjectOutcome::Updated {
            deactivation: Some(_),
            ..
        } => Color::Magenta,
        ProjectOutcome::Updated { classification, .. } if classification.is_stale() => {
            Color::Yellow
        }
        ProjectOutcome::Updated { .. } => Color::Green,
        ProjectOutcome::ReadOnly => Color::Blue,
        ProjectOutcome::Skipped(_) => Color::White,
        ProjectOutcome::Failed(_) => Color::Red,
    }
}

fn detail(outcome: &ProjectOutcome) -> String {
    match outcome {
        ProjectOutcome::Updated {
            tag,
            criticality,
            criticality_outcome,
            ..
        } => {
            let mut detail = format!("{tag}, criticality {criticality}");
            if *criticality_outcome == UpdateOutcome::AlreadyApplied {
                detail.push_str(" (already set)");
            }
            detail
        }
        ProjectOutcome::ReadOnly => "project not found, likely read-only".to_string(),
        ProjectOutcome::Skipped(reason) => reason.to_string(),
        ProjectOutcome::Failed(message) => message.clone(),
    }
}
