use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::{info, warn};

use staleguard_core::error::StaleguardError;
use staleguard_core::models::org::Organization;
use staleguard_core::models::project::Project;
use staleguard_discover::{Discoverer, Discovery, OrgFailure};
use staleguard_host::Inspector;
use staleguard_registry::Registry;

use crate::report::{OrgFailureReport, ProjectOutcome, ProjectReport, RunReport, SkipReason};
use crate::tagger::Synchronizer;

/// Options for one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Org names, slugs or ids to process. Empty means every org.
    pub orgs: Vec<String>,
    pub dry_run: bool,
    pub status_tag_key: String,
}

/// Runs the two passes: classify every repository, then update every project.
pub struct ReconcileEngine<'a> {
    registry: &'a dyn Registry,
    inspector: Inspector<'a>,
    options: RunOptions,
    progress: ProgressBar,
}

impl<'a> ReconcileEngine<'a> {
    pub fn new(registry: &'a dyn Registry, inspector: Inspector<'a>, options: RunOptions) -> Self {
        Self {
            registry,
            inspector,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Organizations visible to the token, narrowed by the org selectors.
    pub async fn select_orgs(&self) -> Result<Vec<Organization>, StaleguardError> {
        let all = self.registry.list_organizations().await?;
        if self.options.orgs.is_empty() {
            return Ok(all);
        }
        for selector in &self.options.orgs {
            if !all.iter().any(|o| o.matches(selector)) {
                warn!(selector, "no organization matches");
            }
        }
        Ok(all
            .into_iter()
            .filter(|o| self.options.orgs.iter().any(|s| o.matches(s)))
            .collect())
    }

    /// Discovery pass. Must complete before any project is touched.
    pub async fn discover(
        &self,
        orgs: &[Organization],
        now: DateTime<Utc>,
    ) -> Result<Discovery, StaleguardError> {
        let mut discoverer = Discoverer::new(self.registry, &self.inspector, now);
        for org in orgs {
            self.progress
                .set_message(format!("classifying repositories of {}", org.name));
            discoverer.discover_org(org).await?;
            self.progress
                .set_message(format!("{} repositories classified", discoverer.classified()));
            self.progress.tick();
        }
        let discovery = discoverer.finish();
        info!(
            repositories = discovery.classifications.len(),
            stale = discovery.classifications.stale_urls().len(),
            archived = discovery.classifications.archived_urls().len(),
            "discovery complete"
        );
        Ok(discovery)
    }

    /// Update pass over every project of `orgs`, reading only from `discovery`.
    pub async fn update(
        &self,
        orgs: &[Organization],
        discovery: &Discovery,
    ) -> Result<RunReport, StaleguardError> {
        let sync = Synchronizer::new(
            self.registry,
            self.options.status_tag_key.clone(),
            self.options.dry_run,
        );
        let mut report = RunReport {
            dry_run: self.options.dry_run,
            ..RunReport::default()
        };
        for (_, classification) in discovery.classifications.iter() {
            report.repositories.record(classification);
        }
        report
            .org_failures
            .extend(discovery.failures.iter().map(org_failure));

        for org in orgs {
            if discovery.failures.iter().any(|f| f.org.id == org.id) {
                continue;
            }
            self.progress
                .set_message(format!("updating projects of {}", org.name));
            let projects = match self.registry.list_projects(&org.id).await {
                Ok(projects) => projects,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(org = %org.name, error = %e, "could not list projects");
                    report.org_failures.push(OrgFailureReport {
                        org: org.name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            for mut project in projects {
                let (url, outcome) = self
                    .update_project(&sync, org, &mut project, discovery)
                    .await?;
                report.projects.push(ProjectReport {
                    org: org.name.clone(),
                    project: project.name,
                    url,
                    outcome,
                });
                self.progress.tick();
            }
        }

        Ok(report)
    }

    async fn update_project(
        &self,
        sync: &Synchronizer<'_>,
        org: &Organization,
        project: &mut Project,
        discovery: &Discovery,
    ) -> Result<(Option<String>, ProjectOutcome), StaleguardError> {
        let url = match self.project_url(org, project, discovery).await {
            Ok(Ok(url)) => url,
            Ok(Err(reason)) => {
                info!(project = %project.name, %reason, "skipping project");
                return Ok((None, ProjectOutcome::Skipped(reason)));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(project = %project.name, error = %e, "could not resolve target");
                return Ok((None, ProjectOutcome::Failed(e.to_string())));
            }
        };

        let Some(classification) = discovery.classifications.get(&url) else {
            warn!(project = %project.name, %url, "repository was not classified during discovery");
            return Ok((Some(url), ProjectOutcome::Skipped(SkipReason::NotClassified)));
        };

        info!(project = %project.name, %url, %classification, "updating project");
        let outcome = match sync.sync_project(project, classification).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(project = %project.name, error = %e, "project update failed");
                ProjectOutcome::Failed(e.to_string())
            }
        };
        Ok((Some(url), outcome))
    }

    /// Repository URL of the project's target, from the discovery index or a direct fetch.
    async fn project_url(
        &self,
        org: &Organization,
        project: &Project,
        discovery: &Discovery,
    ) -> Result<Result<String, SkipReason>, StaleguardError> {
        let Some(target_id) = &project.target_id else {
            return Ok(Err(SkipReason::NoTarget));
        };
        let url = match discovery.targets.get(&org.id, target_id) {
            Some(url) => url.map(str::to_string),
            None => self.registry.resolve_target(&org.id, target_id).await?.url,
        };
        Ok(url.ok_or(SkipReason::NoRepositoryUrl))
    }

    /// Both passes, in order.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport, StaleguardError> {
        let orgs = self.select_orgs().await?;
        info!(
            orgs = orgs.len(),
            stale_days = self.inspector.stale_days(),
            dry_run = self.options.dry_run,
            "starting reconciliation"
        );
        let discovery = self.discover(&orgs, now).await?;
        let report = self.update(&orgs, &discovery).await?;
        self.progress.finish_and_clear();
        Ok(report)
    }
}

fn org_failure(failure: &OrgFailure) -> OrgFailureReport {
    OrgFailureReport {
        org: failure.org.name.clone(),
        message: failure.message.clone(),
    }
}
