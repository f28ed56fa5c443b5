//! End-to-end runs of the engine against in-memory platform and host.

use chrono::{DateTime, Duration, TimeZone, Utc};

use staleguard_core::error::UpdateOutcome;
use staleguard_core::models::classification::{Classification, InaccessibleReason};
use staleguard_core::models::org::{OrgId, Organization};
use staleguard_core::models::project::{Criticality, Project, ProjectId, Tag};
use staleguard_core::models::target::{Target, TargetId};
use staleguard_core::retry::RetryPolicy;
use staleguard_host::memory::MemoryProvider;
use staleguard_host::Inspector;
use staleguard_registry::memory::{MemoryRegistry, RegistryCall};
use staleguard_sync::engine::{ReconcileEngine, RunOptions};
use staleguard_sync::report::{ProjectOutcome, RunReport, SkipReason};

const KEY: &str = "active_repo";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        tries: 2,
        delay: std::time::Duration::ZERO,
        backoff: 2,
    }
}

fn options() -> RunOptions {
    RunOptions {
        orgs: Vec::new(),
        dry_run: false,
        status_tag_key: KEY.to_string(),
    }
}

fn project(id: &str, org: &str, target: &str) -> Project {
    Project::new(id, format!("{id}:package.json"), OrgId::from(org), Some(TargetId::from(target)))
}

/// One org, one target, one project pointing at `acme/<repo>`.
fn single(repo: &str) -> MemoryRegistry {
    let org = Organization::new("o-1", "Alpha");
    MemoryRegistry::new()
        .with_org(org.clone())
        .with_target(
            &org.id,
            Target::new("t-1", repo, Some(format!("https://github.com/acme/{repo}").as_str())),
        )
        .with_project(project("p-1", "o-1", "t-1"))
}

async fn run(registry: &MemoryRegistry, provider: &MemoryProvider, options: RunOptions) -> RunReport {
    let inspector = Inspector::new(provider, 90, fast_retry());
    ReconcileEngine::new(registry, inspector, options)
        .run(now())
        .await
        .unwrap()
}

fn deactivations(registry: &MemoryRegistry) -> usize {
    registry
        .mutations()
        .iter()
        .filter(|c| matches!(c, RegistryCall::Deactivate(_)))
        .count()
}

fn status_tags(project: &Project) -> Vec<Tag> {
    project.tags_with_key(KEY).cloned().collect()
}

#[tokio::test]
async fn test_recently_pushed_repo_is_tagged_active() {
    let registry = single("widgets");
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(10), false);

    let report = run(&registry, &provider, options()).await;

    let stored = registry.project(&ProjectId::from("p-1")).unwrap();
    assert_eq!(status_tags(&stored), vec![Tag::new(KEY, "true")]);
    assert_eq!(stored.business_criticality, vec![Criticality::High]);
    assert_eq!(deactivations(&registry), 0);
    assert_eq!(report.repositories.active, 1);
    assert_eq!(report.summary().tagged_active, 1);
}

#[tokio::test]
async fn test_stale_repo_is_tagged_inactive() {
    let registry = single("widgets");
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(200), false);

    let report = run(&registry, &provider, options()).await;

    let stored = registry.project(&ProjectId::from("p-1")).unwrap();
    assert_eq!(status_tags(&stored), vec![Tag::new(KEY, "false")]);
    assert_eq!(stored.business_criticality, vec![Criticality::Low]);
    assert_eq!(deactivations(&registry), 0);
    assert_eq!(report.summary().tagged_inactive, 1);
}

#[tokio::test]
async fn test_archived_repo_is_deactivated_once() {
    let registry = single("widgets");
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(500), true);

    let report = run(&registry, &provider, options()).await;

    let stored = registry.project(&ProjectId::from("p-1")).unwrap();
    assert_eq!(status_tags(&stored), vec![Tag::new(KEY, "false")]);
    assert_eq!(stored.business_criticality, vec![Criticality::Low]);
    assert_eq!(deactivations(&registry), 1);
    assert!(registry.is_deactivated(&ProjectId::from("p-1")));
    assert_eq!(report.repositories.archived, 1);
    assert_eq!(report.summary().deactivated, 1);
}

#[tokio::test]
async fn test_missing_repo_leaves_project_untouched() {
    let mut tagged = project("p-1", "o-1", "t-1");
    tagged.tags = vec![Tag::new(KEY, "true")];
    tagged.business_criticality = vec![Criticality::High];
    let org = Organization::new("o-1", "Alpha");
    let registry = MemoryRegistry::new()
        .with_org(org.clone())
        .with_target(&org.id, Target::new("t-1", "gone", Some("https://github.com/acme/gone")))
        .with_project(tagged);
    // unknown to the provider, so it answers 404
    let provider = MemoryProvider::new();

    let report = run(&registry, &provider, options()).await;

    assert!(registry.mutations().is_empty());
    let stored = registry.project(&ProjectId::from("p-1")).unwrap();
    assert_eq!(status_tags(&stored), vec![Tag::new(KEY, "true")]);
    assert_eq!(stored.business_criticality, vec![Criticality::High]);
    assert_eq!(report.repositories.inaccessible, 1);
    assert_eq!(
        report.projects[0].outcome,
        ProjectOutcome::Skipped(SkipReason::Inaccessible(InaccessibleReason::Unauthorized))
    );
}

#[tokio::test]
async fn test_criticality_already_set_counts_as_success() {
    let mut current = project("p-1", "o-1", "t-1");
    current.business_criticality = vec![Criticality::High];
    let org = Organization::new("o-1", "Alpha");
    let registry = MemoryRegistry::new()
        .with_org(org.clone())
        .with_target(&org.id, Target::new("t-1", "widgets", Some("https://github.com/acme/widgets")))
        .with_project(current);
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(1), false);

    let report = run(&registry, &provider, options()).await;

    let criticality_calls = registry
        .mutations()
        .iter()
        .filter(|c| matches!(c, RegistryCall::SetCriticality(..)))
        .count();
    assert_eq!(criticality_calls, 1);
    assert!(matches!(
        report.projects[0].outcome,
        ProjectOutcome::Updated {
            criticality_outcome: UpdateOutcome::AlreadyApplied,
            ..
        }
    ));
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_shared_repo_across_orgs_is_fetched_once() {
    let a = Organization::new("o-a", "Alpha");
    let b = Organization::new("o-b", "Beta");
    let registry = MemoryRegistry::new()
        .with_org(a.clone())
        .with_org(b.clone())
        .with_target(&a.id, Target::new("t-a", "acme/widgets", Some("https://github.com/acme/widgets")))
        .with_target(&b.id, Target::new("t-b", "acme/widgets", Some("https://github.com/Acme/widgets.git")))
        .with_project(project("p-a", "o-a", "t-a"))
        .with_project(project("p-b", "o-b", "t-b"));
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(120), false);

    let report = run(&registry, &provider, options()).await;

    assert_eq!(provider.total_calls(), 1);
    let first = registry.project(&ProjectId::from("p-a")).unwrap();
    let second = registry.project(&ProjectId::from("p-b")).unwrap();
    assert_eq!(status_tags(&first), vec![Tag::new(KEY, "false")]);
    assert_eq!(status_tags(&first), status_tags(&second));
    assert_eq!(first.business_criticality, second.business_criticality);
    assert_eq!(report.repositories.total(), 1);
}

#[tokio::test]
async fn test_discovery_completes_before_any_update() {
    let a = Organization::new("o-a", "Alpha");
    let b = Organization::new("o-b", "Beta");
    let registry = MemoryRegistry::new()
        .with_org(a.clone())
        .with_org(b.clone())
        .with_target(&a.id, Target::new("t-a", "one", Some("https://github.com/acme/one")))
        .with_target(&b.id, Target::new("t-b", "two", Some("https://github.com/acme/two")))
        .with_project(project("p-a", "o-a", "t-a"))
        .with_project(project("p-b", "o-b", "t-b"));
    let provider = MemoryProvider::new()
        .with_repo("acme", "one", now() - Duration::days(5), false)
        .with_repo("acme", "two", now() - Duration::days(5), false);

    run(&registry, &provider, options()).await;

    let calls = registry.calls();
    let last_listing = calls
        .iter()
        .rposition(|c| matches!(c, RegistryCall::ListTargets(_)))
        .unwrap();
    let first_mutation = calls
        .iter()
        .position(|c| matches!(c, RegistryCall::AddTag(..)))
        .unwrap();
    assert!(last_listing < first_mutation);
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let registry = single("widgets");
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(200), false);

    run(&registry, &provider, options()).await;
    let after_first = registry.project(&ProjectId::from("p-1")).unwrap();

    let report = run(&registry, &provider, options()).await;
    let after_second = registry.project(&ProjectId::from("p-1")).unwrap();

    assert_eq!(after_first.tags, after_second.tags);
    assert_eq!(after_first.business_criticality, after_second.business_criticality);
    assert!(matches!(
        report.projects[0].outcome,
        ProjectOutcome::Updated {
            criticality_outcome: UpdateOutcome::AlreadyApplied,
            deactivation: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_projects_without_repository_are_skipped() {
    let org = Organization::new("o-1", "Alpha");
    let mut orphan = project("p-2", "o-1", "t-x");
    orphan.target_id = None;
    let registry = MemoryRegistry::new()
        .with_org(org.clone())
        .with_target(&org.id, Target::new("t-1", "cli-upload", None))
        .with_project(project("p-1", "o-1", "t-1"))
        .with_project(orphan);
    let provider = MemoryProvider::new();

    let report = run(&registry, &provider, options()).await;

    let outcomes: Vec<_> = report.projects.iter().map(|p| p.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![
            ProjectOutcome::Skipped(SkipReason::NoRepositoryUrl),
            ProjectOutcome::Skipped(SkipReason::NoTarget),
        ]
    );
    assert_eq!(provider.total_calls(), 0);
    assert!(registry.mutations().is_empty());
}

#[tokio::test]
async fn test_org_selection_and_failures() {
    let good = Organization::new("o-1", "Alpha");
    let broken = Organization::new("o-2", "Beta");
    let ignored = Organization::new("o-3", "Gamma");
    let registry = MemoryRegistry::new()
        .with_org(good.clone())
        .with_org(broken.clone())
        .with_org(ignored.clone())
        .with_broken_org(&broken.id)
        .with_target(&good.id, Target::new("t-1", "widgets", Some("https://github.com/acme/widgets")))
        .with_target(&ignored.id, Target::new("t-3", "other", Some("https://github.com/acme/other")))
        .with_project(project("p-1", "o-1", "t-1"))
        .with_project(project("p-3", "o-3", "t-3"));
    let provider = MemoryProvider::new()
        .with_repo("acme", "widgets", now() - Duration::days(1), false)
        .with_repo("acme", "other", now() - Duration::days(1), false);

    let report = run(
        &registry,
        &provider,
        RunOptions {
            orgs: vec!["alpha".into(), "o-2".into()],
            ..options()
        },
    )
    .await;

    assert_eq!(provider.calls_for("acme", "other"), 0);
    assert_eq!(report.projects.len(), 1);
    assert_eq!(report.org_failures.len(), 1);
    assert_eq!(report.org_failures[0].org, "Beta");
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let registry = single("widgets");
    let provider = MemoryProvider::new().with_repo("acme", "widgets", now() - Duration::days(500), true);

    let report = run(
        &registry,
        &provider,
        RunOptions {
            dry_run: true,
            ..options()
        },
    )
    .await;

    assert!(report.dry_run);
    assert!(registry.mutations().is_empty());
    assert!(matches!(
        &report.projects[0].outcome,
        ProjectOutcome::Updated { classification: Classification::Archived, .. }
    ));
}

#[tokio::test]
async fn test_targets_missing_from_discovery_are_resolved() {
    let org = Organization::new("o-1", "Alpha");
    let registry = MemoryRegistry::new()
        .with_org(org.clone())
        .with_target(&org.id, Target::new("t-1", "widgets", Some("https://github.com/acme/widgets")))
        .with_unlisted_target(&org.id, Target::new("t-2", "widgets", Some("git@github.com:acme/widgets.git")))
        .with_unlisted_target(&org.id, Target::new("t-3", "other", Some("https://github.com/acme/other")))
        .with_project(project("p-gone", "o-1", "t-gone"))
        .with_project(project("p-2", "o-1", "t-2"))
        .with_project(project("p-3", "o-1", "t-3"));
    let provider = MemoryProvider::new()
        .with_repo("acme", "widgets", now() - Duration::days(4), false)
        .with_repo("acme", "other", now() - Duration::days(4), false);

    let report = run(&registry, &provider, options()).await;

    let resolved: Vec<_> = registry
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            RegistryCall::ResolveTarget(id) => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(
        resolved,
        vec![TargetId::from("t-gone"), TargetId::from("t-2"), TargetId::from("t-3")]
    );

    // an unknown target fails that project only
    assert!(matches!(report.projects[0].outcome, ProjectOutcome::Failed(_)));
    assert!(report.has_failures());

    // same repository as a listed target, so its classification is reused
    assert!(matches!(
        report.projects[1].outcome,
        ProjectOutcome::Updated { classification: Classification::Active, .. }
    ));
    let stored = registry.project(&ProjectId::from("p-2")).unwrap();
    assert_eq!(status_tags(&stored), vec![Tag::new(KEY, "true")]);

    // never inspected during discovery
    assert_eq!(
        report.projects[2].outcome,
        ProjectOutcome::Skipped(SkipReason::NotClassified)
    );
    assert_eq!(provider.calls_for("acme", "other"), 0);
    assert!(registry.project(&ProjectId::from("p-3")).unwrap().tags.is_empty());
}
