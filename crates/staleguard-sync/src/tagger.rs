use tracing::{info, warn};

use staleguard_core::error::{StaleguardError, UpdateOutcome};
use staleguard_core::models::classification::Classification;
use staleguard_core::models::project::{Criticality, Project, Tag};
use staleguard_registry::Registry;

use crate::report::{ProjectOutcome, SkipReason};

/// Status tag and criticality written for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub tag: Tag,
    pub tag_outcome: UpdateOutcome,
    pub criticality: Criticality,
    pub criticality_outcome: UpdateOutcome,
}

/// Writes repository status back onto platform projects.
///
/// The local `Project` is kept in step with every mutation so repeated calls
/// within a run see the tags the platform now holds.
pub struct Synchronizer<'a> {
    registry: &'a dyn Registry,
    tag_key: String,
    dry_run: bool,
}

impl<'a> Synchronizer<'a> {
    pub fn new(registry: &'a dyn Registry, tag_key: impl Into<String>, dry_run: bool) -> Self {
        Self {
            registry,
            tag_key: tag_key.into(),
            dry_run,
        }
    }

    /// Remove both `<key>=true` and `<key>=false` where present.
    /// Returns `NotFoundOrReadOnly` as soon as the platform refuses a removal.
    pub async fn clear_status_tags(&self, project: &mut Project) -> Result<UpdateOutcome, StaleguardError> {
        let mut outcome = UpdateOutcome::AlreadyApplied;
        for value in ["true", "false"] {
            let tag = Tag::new(&self.tag_key, value);
            if !project.has_tag(&tag) {
                continue;
            }
            let result = if self.dry_run {
                info!(project = %project.name, %tag, "dry run: would remove tag");
                UpdateOutcome::DryRun
            } else {
                self.registry
                    .remove_tag(&project.org_id, &project.id, &tag)
                    .await?
            };
            if result == UpdateOutcome::NotFoundOrReadOnly {
                warn!(project = %project.name, %tag, "project not found, likely read-only");
                return Ok(result);
            }
            project.tags.retain(|t| t != &tag);
            outcome = result;
        }
        Ok(outcome)
    }

    /// Add the status tag and set the criticality for a known classification.
    /// Returns `None` for inaccessible repositories, which are never guessed at.
    pub async fn apply_status(
        &self,
        project: &mut Project,
        classification: &Classification,
    ) -> Result<Option<StatusChange>, StaleguardError> {
        let (Some(tag), Some(criticality)) = (
            classification.status_tag(&self.tag_key),
            classification.criticality(),
        ) else {
            return Ok(None);
        };

        let tag_outcome = if project.has_tag(&tag) {
            UpdateOutcome::AlreadyApplied
        } else if self.dry_run {
            info!(project = %project.name, %tag, "dry run: would add tag");
            UpdateOutcome::DryRun
        } else {
            self.registry
                .add_tag(&project.org_id, &project.id, &tag)
                .await?
        };
        if tag_outcome == UpdateOutcome::NotFoundOrReadOnly {
            warn!(project = %project.name, %tag, "project not found, likely read-only");
        } else if !project.has_tag(&tag) {
            project.tags.push(tag.clone());
        }

        let criticality_outcome = if tag_outcome == UpdateOutcome::NotFoundOrReadOnly {
            UpdateOutcome::NotFoundOrReadOnly
        } else {
            self.set_criticality(project, criticality).await?
        };

        Ok(Some(StatusChange {
            tag,
            tag_outcome,
            criticality,
            criticality_outcome,
        }))
    }

    async fn set_criticality(
        &self,
        project: &mut Project,
        criticality: Criticality,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let outcome = if self.dry_run {
            info!(project = %project.name, %criticality, "dry run: would set criticality");
            UpdateOutcome::DryRun
        } else {
            self.registry
                .set_criticality(&project.org_id, &project.id, criticality)
                .await?
        };
        match outcome {
            UpdateOutcome::Applied => {
                info!(project = %project.name, %criticality, "criticality set");
            }
            UpdateOutcome::AlreadyApplied => {
                info!(project = %project.name, %criticality, "criticality already applied");
            }
            UpdateOutcome::NotFoundOrReadOnly => {
                warn!(project = %project.name, %criticality, "project not found, likely read-only");
            }
            UpdateOutcome::DryRun => {}
        }
        if outcome.is_success() {
            project.business_criticality = vec![criticality];
        }
        Ok(outcome)
    }

    /// Deactivate an archived repository's project.
    async fn deactivate(&self, project: &Project) -> Result<UpdateOutcome, StaleguardError> {
        if self.dry_run {
            info!(project = %project.name, "dry run: would deactivate project");
            return Ok(UpdateOutcome::DryRun);
        }
        let outcome = self.registry.deactivate(&project.org_id, &project.id).await?;
        match outcome {
            UpdateOutcome::NotFoundOrReadOnly => {
                warn!(project = %project.name, "project not found, likely read-only");
            }
            _ => info!(project = %project.name, %outcome, "project deactivated"),
        }
        Ok(outcome)
    }

    /// Clear, tag, set criticality, and deactivate when archived.
    /// Inaccessible repositories leave the project exactly as it was.
    pub async fn sync_project(
        &self,
        project: &mut Project,
        classification: &Classification,
    ) -> Result<ProjectOutcome, StaleguardError> {
        if let Classification::Inaccessible(reason) = classification {
            info!(project = %project.name, %reason, "repository inaccessible, leaving tags untouched");
            return Ok(ProjectOutcome::Skipped(SkipReason::Inaccessible(reason.clone())));
        }

        if self.clear_status_tags(project).await? == UpdateOutcome::NotFoundOrReadOnly {
            return Ok(ProjectOutcome::ReadOnly);
        }

        let Some(change) = self.apply_status(project, classification).await? else {
            return Ok(ProjectOutcome::Skipped(SkipReason::NotClassified));
        };
        if change.tag_outcome == UpdateOutcome::NotFoundOrReadOnly
            || change.criticality_outcome == UpdateOutcome::NotFoundOrReadOnly
        {
            return Ok(ProjectOutcome::ReadOnly);
        }
        info!(
            project = %project.name,
            tag = %change.tag,
            "project tagged {}",
            if classification.is_stale() { "inactive" } else { "active" }
        );

        let deactivation = if classification.is_archived() {
            Some(self.deactivate(project).await?)
        } else {
            None
        };

        Ok(ProjectOutcome::Updated {
            classification: classification.clone(),
            tag: change.tag,
            criticality: change.criticality,
            criticality_outcome: change.criticality_outcome,
            deactivation,
        })
    }
}
